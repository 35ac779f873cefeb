use std::{
    fs, io,
    path::{Path, PathBuf},
};

use log::{debug, info, warn};

use crate::error::CartridgeError;

const HEADER_END: usize = 0x0150;
const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const NEW_LICENSEE: usize = 0x0144;
const CART_TYPE: usize = 0x0147;
const ROM_SIZE: usize = 0x0148;
const RAM_SIZE: usize = 0x0149;
const OLD_LICENSEE: usize = 0x014B;
const VERSION: usize = 0x014C;
const HEADER_CHECKSUM: usize = 0x014D;

const ROM_BANK_SIZE: usize = 0x4000;
const RAM_BANK_SIZE: usize = 0x2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    /// A mapper this core does not implement; banked as MBC1.
    Unsupported(u8),
}

/// Decoded cartridge header (gbdev.io/pandocs/The_Cartridge_Header.html).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartridgeHeader {
    pub title: String,
    pub cart_type: u8,
    pub rom_size_code: u8,
    pub ram_size_code: u8,
    pub old_licensee: u8,
    pub new_licensee: [u8; 2],
    pub version: u8,
    pub checksum: u8,
}

impl CartridgeHeader {
    /// ROM size in KiB, `32 << code`.
    pub fn rom_kib(&self) -> usize {
        32usize.checked_shl(self.rom_size_code as u32).unwrap_or(0)
    }

    pub fn ram_kib(&self) -> usize {
        match self.ram_size_code {
            0x02 => 8,
            0x03 => 32,
            0x04 => 128,
            0x05 => 64,
            _ => 0,
        }
    }

    pub fn cart_type_name(&self) -> &'static str {
        cart_type_name(self.cart_type)
    }

    pub fn licensee(&self) -> &'static str {
        match self.old_licensee {
            0x00 => "None",
            0x01 => "Nintendo",
            0x33 => new_licensee_name(self.new_licensee),
            _ => "Unknown",
        }
    }

    pub fn has_battery(&self) -> bool {
        matches!(
            self.cart_type,
            0x03 | 0x06 | 0x09 | 0x0D | 0x0F | 0x10 | 0x13 | 0x1B | 0x1E | 0x22 | 0xFF
        )
    }

    pub fn mbc_type(&self) -> MbcType {
        match self.cart_type {
            0x00 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            other => MbcType::Unsupported(other),
        }
    }
}

#[derive(Debug)]
struct Mbc1State {
    ram_enable: bool,
    /// Low five bank bits, never zero.
    rom_bank: u8,
    /// Two-bit register shared between RAM bank and upper ROM bank bits.
    ram_bank: u8,
    /// 0 favours large ROM, 1 favours large RAM.
    mode: u8,
    rom_bank_mask: u8,
}

impl Mbc1State {
    fn new(rom_kib: usize) -> Self {
        let rom_bank_mask = match rom_kib {
            32 => 0x01,
            64 => 0x03,
            128 => 0x07,
            256 => 0x0F,
            _ => 0x1F,
        };
        Self {
            ram_enable: false,
            rom_bank: 1,
            ram_bank: 0,
            mode: 0,
            rom_bank_mask,
        }
    }
}

#[derive(Debug)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
    pub mbc: MbcType,
    pub title: String,
    header: CartridgeHeader,
    save_path: Option<PathBuf>,
    state: Mbc1State,
    need_save: bool,
}

impl Cartridge {
    /// Load a ROM image from disk. Battery-backed carts also pick up the
    /// sibling `.sav` file when one exists.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| CartridgeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut cart = Self::load(data)?;

        if cart.header.has_battery() {
            let mut save = PathBuf::from(path);
            save.set_extension("sav");
            match fs::read(&save) {
                Ok(bytes) => {
                    for (d, s) in cart.ram.iter_mut().zip(bytes.iter()) {
                        *d = *s;
                    }
                    debug!("Loaded {} bytes of battery RAM from {}", bytes.len(), save.display());
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to read save file {}: {e}", save.display()),
            }
            cart.save_path = Some(save);
        }

        info!(
            "Loaded ROM: {} ({}, {} KiB ROM, {} KiB RAM, licensee {})",
            cart.title,
            cart.header.cart_type_name(),
            cart.header.rom_kib(),
            cart.header.ram_kib(),
            cart.header.licensee()
        );
        Ok(cart)
    }

    /// Build a cartridge from an in-memory image, validating the header
    /// checksum.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooSmall { len: data.len() });
        }
        let view = Header::parse(&data);
        let computed = view.computed_checksum();
        let expected = data[HEADER_CHECKSUM];
        if computed != expected {
            return Err(CartridgeError::ChecksumMismatch { expected, computed });
        }

        let header = view.decode();
        let mbc = header.mbc_type();
        if let MbcType::Unsupported(code) = mbc {
            warn!(
                "Cartridge type {code:02X} ({}) is not supported; using MBC1 banking",
                cart_type_name(code)
            );
        }

        Ok(Self {
            ram: vec![0; header.ram_kib() * 1024],
            state: Mbc1State::new(header.rom_kib()),
            title: header.title.clone(),
            rom: data,
            mbc,
            header,
            save_path: None,
            need_save: false,
        })
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    /// Upper ROM bank bits contributed by the RAM bank register on 1 MiB and
    /// 2 MiB carts.
    fn extra_rom_bits(&self) -> usize {
        match self.header.rom_kib() {
            1024 => ((self.state.ram_bank & 0x01) as usize) << 5,
            2048 => (self.state.ram_bank as usize) << 5,
            _ => 0,
        }
    }

    fn ram_index(&self, addr: u16) -> usize {
        let offset = addr as usize - 0xA000;
        if self.header.ram_kib() == 32 && self.state.mode == 1 {
            RAM_BANK_SIZE * self.state.ram_bank as usize + offset
        } else {
            offset
        }
    }

    pub fn read(&self, addr: u16) -> u8 {
        if self.mbc == MbcType::NoMbc {
            // 32 KiB mapped straight through, no external RAM
            return match addr {
                0x0000..=0x7FFF => self.rom.get(addr as usize).copied().unwrap_or(0xFF),
                _ => 0xFF,
            };
        }
        match addr {
            0x0000..=0x3FFF => {
                let bank = if self.state.mode == 1 {
                    self.extra_rom_bits()
                } else {
                    0
                };
                self.rom
                    .get(ROM_BANK_SIZE * bank + addr as usize)
                    .copied()
                    .unwrap_or(0xFF)
            }
            0x4000..=0x7FFF => {
                let bank = self.state.rom_bank as usize | self.extra_rom_bits();
                self.rom
                    .get(ROM_BANK_SIZE * bank + (addr as usize - 0x4000))
                    .copied()
                    .unwrap_or(0xFF)
            }
            0xA000..=0xBFFF => {
                if !self.state.ram_enable || self.ram.is_empty() {
                    return 0xFF;
                }
                self.ram.get(self.ram_index(addr)).copied().unwrap_or(0xFF)
            }
            _ => 0xFF,
        }
    }

    pub fn write(&mut self, addr: u16, val: u8) {
        if self.mbc == MbcType::NoMbc {
            return;
        }
        match addr {
            0x0000..=0x1FFF => {
                self.state.ram_enable = val & 0x0F == 0x0A;
            }
            0x2000..=0x3FFF => {
                // bank 0 is never selectable in the high window
                self.state.rom_bank = if val & 0x1F == 0 {
                    1
                } else {
                    val & self.state.rom_bank_mask
                };
            }
            0x4000..=0x5FFF => {
                self.state.ram_bank = val & 0x03;
            }
            0x6000..=0x7FFF => {
                self.state.mode = val & 0x01;
            }
            0xA000..=0xBFFF => {
                if !self.state.ram_enable || self.ram.is_empty() {
                    return;
                }
                let idx = self.ram_index(addr);
                if let Some(b) = self.ram.get_mut(idx) {
                    *b = val;
                    self.need_save = true;
                }
            }
            _ => {}
        }
    }

    /// Selected bank for the 0x4000-0x7FFF window.
    pub fn rom_bank(&self) -> usize {
        self.state.rom_bank as usize | self.extra_rom_bits()
    }

    pub fn needs_save(&self) -> bool {
        self.need_save
    }

    pub fn save_path(&self) -> Option<&Path> {
        self.save_path.as_deref()
    }

    /// Write battery RAM to the save file and clear the dirty flag. Carts
    /// without a battery or without RAM have nothing to persist.
    pub fn save_ram(&mut self) -> io::Result<()> {
        if let (true, Some(path)) = (self.header.has_battery(), &self.save_path)
            && !self.ram.is_empty()
        {
            fs::write(path, &self.ram)?;
        }
        self.need_save = false;
        Ok(())
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        self.data[TITLE_START..=TITLE_END]
            .iter()
            .filter(|b| b.is_ascii_alphanumeric() || **b == b' ')
            .map(|&b| b as char)
            .collect()
    }

    fn computed_checksum(&self) -> u8 {
        self.data[TITLE_START..HEADER_CHECKSUM]
            .iter()
            .fold(0u8, |c, &b| c.wrapping_sub(b).wrapping_sub(1))
    }

    fn decode(&self) -> CartridgeHeader {
        CartridgeHeader {
            title: self.title(),
            cart_type: self.data[CART_TYPE],
            rom_size_code: self.data[ROM_SIZE],
            ram_size_code: self.data[RAM_SIZE],
            old_licensee: self.data[OLD_LICENSEE],
            new_licensee: [self.data[NEW_LICENSEE], self.data[NEW_LICENSEE + 1]],
            version: self.data[VERSION],
            checksum: self.data[HEADER_CHECKSUM],
        }
    }
}

/// Header checksum over 0x0134-0x014C, for tools that build images.
pub fn header_checksum(rom: &[u8]) -> u8 {
    Header::parse(rom).computed_checksum()
}

pub fn cart_type_name(code: u8) -> &'static str {
    match code {
        0x00 => "ROM ONLY",
        0x01 => "MBC1",
        0x02 => "MBC1+RAM",
        0x03 => "MBC1+RAM+BATTERY",
        0x05 => "MBC2",
        0x06 => "MBC2+BATTERY",
        0x08 => "ROM+RAM",
        0x09 => "ROM+RAM+BATTERY",
        0x0B => "MMM01",
        0x0C => "MMM01+RAM",
        0x0D => "MMM01+RAM+BATTERY",
        0x0F => "MBC3+TIMER+BATTERY",
        0x10 => "MBC3+TIMER+RAM+BATTERY",
        0x11 => "MBC3",
        0x12 => "MBC3+RAM",
        0x13 => "MBC3+RAM+BATTERY",
        0x19 => "MBC5",
        0x1A => "MBC5+RAM",
        0x1B => "MBC5+RAM+BATTERY",
        0x1C => "MBC5+RUMBLE",
        0x1D => "MBC5+RUMBLE+RAM",
        0x1E => "MBC5+RUMBLE+RAM+BATTERY",
        0x20 => "MBC6",
        0x22 => "MBC7+SENSOR+RUMBLE+RAM+BATTERY",
        0xFC => "POCKET CAMERA",
        0xFD => "BANDAI TAMA5",
        0xFE => "HuC3",
        0xFF => "HuC1+RAM+BATTERY",
        _ => "Unknown",
    }
}

/// Publisher for the two-character code used when the old licensee byte is
/// 0x33.
pub fn new_licensee_name(code: [u8; 2]) -> &'static str {
    match &code {
        b"00" => "None",
        b"01" => "Nintendo R&D1",
        b"08" => "Capcom",
        b"13" => "Electronic Arts",
        b"18" => "Hudson Soft",
        b"19" => "b-ai",
        b"20" => "kss",
        b"22" => "pow",
        b"24" => "PCM Complete",
        b"25" => "san-x",
        b"28" => "Kemco Japan",
        b"29" => "seta",
        b"30" => "Viacom",
        b"31" => "Nintendo",
        b"32" => "Bandai",
        b"33" => "Ocean/Acclaim",
        b"34" => "Konami",
        b"35" => "Hector",
        b"37" => "Taito",
        b"38" => "Hudson",
        b"39" => "Banpresto",
        b"41" => "Ubi Soft",
        b"42" => "Atlus",
        b"44" => "Malibu",
        b"46" => "angel",
        b"47" => "Bullet-Proof",
        b"49" => "irem",
        b"50" => "Absolute",
        b"51" => "Acclaim",
        b"52" => "Activision",
        b"53" => "American sammy",
        b"54" => "Konami",
        b"55" => "Hi tech entertainment",
        b"56" => "LJN",
        b"57" => "Matchbox",
        b"58" => "Mattel",
        b"59" => "Milton Bradley",
        b"60" => "Titus",
        b"61" => "Virgin",
        b"64" => "LucasArts",
        b"67" => "Ocean",
        b"69" => "Electronic Arts",
        b"70" => "Infogrames",
        b"71" => "Interplay",
        b"72" => "Broderbund",
        b"73" => "sculptured",
        b"75" => "sci",
        b"78" => "THQ",
        b"79" => "Accolade",
        b"80" => "misawa",
        b"83" => "lozc",
        b"86" => "Tokuma Shoten Intermedia",
        b"87" => "Tsukuda Original",
        b"91" => "Chunsoft",
        b"92" => "Video system",
        b"93" => "Ocean/Acclaim",
        b"95" => "Varie",
        b"96" => "Yonezawa/s'pal",
        b"97" => "Kaneko",
        b"99" => "Pack in soft",
        b"9H" => "Bottom Up",
        b"A4" => "Konami (Yu-Gi-Oh!)",
        b"BL" => "MTO",
        b"DK" => "Kodansha",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(cart_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000usize << rom_code];
        rom[TITLE_START..TITLE_START + 9].copy_from_slice(b"TEST-ROM!");
        rom[CART_TYPE] = cart_type;
        rom[ROM_SIZE] = rom_code;
        rom[RAM_SIZE] = ram_code;
        for bank in 0..rom.len() / ROM_BANK_SIZE {
            rom[bank * ROM_BANK_SIZE + 0x200] = bank as u8;
        }
        rom[HEADER_CHECKSUM] = header_checksum(&rom);
        rom
    }

    #[test]
    fn title_keeps_alphanumerics_and_spaces() {
        let cart = Cartridge::load(image(0x01, 0, 0)).unwrap();
        assert_eq!(cart.title, "TESTROM");
    }

    #[test]
    fn checksum_formula() {
        let mut rom = vec![0u8; HEADER_END];
        // 25 zero bytes, each subtracting one
        assert_eq!(header_checksum(&rom), 0u8.wrapping_sub(25));
        rom[TITLE_START] = 0x10;
        assert_eq!(header_checksum(&rom), 0u8.wrapping_sub(25 + 0x10));
    }

    #[test]
    fn too_small_is_rejected() {
        let err = Cartridge::load(vec![0; 0x100]).unwrap_err();
        assert!(matches!(err, CartridgeError::TooSmall { len: 0x100 }));
    }

    #[test]
    fn low_window_follows_ram_bank_in_mode_one_on_large_rom() {
        // 1 MiB: code 5, 64 banks
        let mut cart = Cartridge::load(image(0x01, 5, 0)).unwrap();
        cart.write(0x4000, 0x01);
        assert_eq!(cart.read(0x0200), 0x00);
        cart.write(0x6000, 0x01);
        assert_eq!(cart.read(0x0200), 0x20);
        cart.write(0x2000, 0x03);
        assert_eq!(cart.read(0x4200), 0x23);
        assert_eq!(cart.rom_bank(), 0x23);
    }

    #[test]
    fn ram_banking_needs_32k_and_mode_one() {
        let mut cart = Cartridge::load(image(0x03, 1, 3)).unwrap();
        assert_eq!(cart.ram.len(), 32 * 1024);
        cart.write(0x0000, 0x0A);
        cart.write(0x4000, 0x02);
        cart.write(0xA000, 0x11);
        assert_eq!(cart.ram[0], 0x11);
        cart.write(0x6000, 0x01);
        cart.write(0xA000, 0x22);
        assert_eq!(cart.ram[2 * RAM_BANK_SIZE], 0x22);
        assert_eq!(cart.read(0xA000), 0x22);
        assert!(cart.needs_save());
    }

    #[test]
    fn disabled_or_missing_ram_reads_open_bus() {
        let mut cart = Cartridge::load(image(0x02, 0, 2)).unwrap();
        cart.write(0xA000, 0x55);
        assert_eq!(cart.read(0xA000), 0xFF);
        assert!(!cart.needs_save());
        cart.write(0x0000, 0x1A);
        cart.write(0xA000, 0x55);
        assert_eq!(cart.read(0xA000), 0x55);
        cart.write(0x0000, 0x00);
        assert_eq!(cart.read(0xA000), 0xFF);

        let mut no_ram = Cartridge::load(image(0x01, 0, 0)).unwrap();
        no_ram.write(0x0000, 0x0A);
        no_ram.write(0xA000, 0x55);
        assert_eq!(no_ram.read(0xA000), 0xFF);
        assert!(!no_ram.needs_save());
    }

    #[test]
    fn header_tables() {
        let mut rom = image(0x13, 0, 0);
        rom[OLD_LICENSEE] = 0x33;
        rom[NEW_LICENSEE] = b'0';
        rom[NEW_LICENSEE + 1] = b'1';
        rom[HEADER_CHECKSUM] = header_checksum(&rom);
        let cart = Cartridge::load(rom).unwrap();
        let header = cart.header();
        assert_eq!(header.cart_type_name(), "MBC3+RAM+BATTERY");
        assert_eq!(header.licensee(), "Nintendo R&D1");
        assert_eq!(cart.mbc, MbcType::Unsupported(0x13));
        assert!(header.has_battery());

        assert_eq!(cart_type_name(0x04), "Unknown");
        assert_eq!(new_licensee_name(*b"ZZ"), "Unknown");
    }
}
