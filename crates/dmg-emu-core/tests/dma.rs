use dmg_emu_core::mmu::Mmu;

fn fill_source(mmu: &mut Mmu, base: u16) {
    for i in 0..0xA0u16 {
        mmu.write_byte(base + i, (i as u8) ^ 0x5A);
    }
}

#[test]
fn transfer_takes_two_plus_160_steps() {
    let mut mmu = Mmu::new();
    fill_source(&mut mmu, 0xC100);
    mmu.write_byte(0xFF46, 0xC1);
    assert_eq!(mmu.read_byte(0xFF46), 0xC1);

    for _ in 0..161 {
        mmu.dma_step();
        assert_eq!(mmu.read_byte(0xFE00), 0xFF);
    }
    assert!(mmu.dma.active());

    mmu.dma_step();
    assert!(!mmu.dma.active());
    for i in 0..0xA0u16 {
        assert_eq!(mmu.read_byte(0xFE00 + i), (i as u8) ^ 0x5A);
    }
}

#[test]
fn copy_lands_in_oam_progressively() {
    let mut mmu = Mmu::new();
    fill_source(&mut mmu, 0xC000);
    mmu.write_byte(0xFF46, 0xC0);

    for _ in 0..2 + 10 {
        mmu.dma_step();
    }
    assert_eq!(mmu.ppu.oam[9], 9 ^ 0x5A);
    assert_eq!(mmu.ppu.oam[10], 0);
}

#[test]
fn restart_begins_from_the_new_source() {
    let mut mmu = Mmu::new();
    fill_source(&mut mmu, 0xC000);
    for i in 0..0xA0u16 {
        mmu.write_byte(0xD000 + i, 0xEE);
    }

    mmu.write_byte(0xFF46, 0xC0);
    for _ in 0..50 {
        mmu.dma_step();
    }
    mmu.write_byte(0xFF46, 0xD0);
    for _ in 0..162 {
        mmu.dma_step();
    }
    assert!(!mmu.dma.active());
    assert!(mmu.ppu.oam.iter().all(|&b| b == 0xEE));
}

#[test]
fn cpu_drives_dma_from_the_tick_loop() {
    use dmg_emu_core::cpu::Cpu;
    use dmg_emu_core::registers::Registers;

    let mut mmu = Mmu::new();
    fill_source(&mut mmu, 0xC100);
    // LD A,0xC1 ; LDH (0x46),A ; then NOPs
    let program = [0x3E, 0xC1, 0xE0, 0x46];
    for (i, b) in program.iter().enumerate() {
        mmu.write_byte(0xC000 + i as u16, *b);
    }
    let mut regs = Registers::zeroed();
    regs.set_pc(0xC000);
    regs.set_sp(0xDFF0);
    let mut cpu = Cpu::with_registers(regs);

    cpu.step(&mut mmu).unwrap();
    cpu.step(&mut mmu).unwrap();
    assert!(mmu.dma.active());
    while mmu.dma.active() {
        cpu.step(&mut mmu).unwrap();
    }
    assert_eq!(mmu.ppu.oam[0x9F], 0x9F ^ 0x5A);
}
