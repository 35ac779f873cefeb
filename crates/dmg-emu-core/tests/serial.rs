use dmg_emu_core::interrupt::{Interrupt, Interrupts};
use dmg_emu_core::mmu::Mmu;
use dmg_emu_core::serial::Serial;

#[test]
fn internal_clock_transfer_completes_at_once() {
    let mut ints = Interrupts::new();
    ints.flags = 0;
    let mut serial = Serial::new();

    serial.write(0xFF01, b'O', &mut ints);
    serial.write(0xFF02, 0x81, &mut ints);

    assert_eq!(serial.peek_output(), b"O");
    assert_eq!(serial.read(0xFF01), 0xFF);
    assert_eq!(serial.read(0xFF02) & 0x80, 0);
    assert_ne!(ints.flags & Interrupt::Serial.bit(), 0);
}

#[test]
fn external_clock_waits_for_a_partner() {
    let mut ints = Interrupts::new();
    ints.flags = 0;
    let mut serial = Serial::new();

    serial.write(0xFF01, 0x12, &mut ints);
    serial.write(0xFF02, 0x80, &mut ints);

    assert!(serial.peek_output().is_empty());
    assert_eq!(serial.read(0xFF02), 0xFE);
    assert_eq!(ints.flags, 0);
}

#[test]
fn captured_text_drains_through_the_bus() {
    let mut mmu = Mmu::new();
    for &b in b"Passed" {
        mmu.write_byte(0xFF01, b);
        mmu.write_byte(0xFF02, 0x81);
    }
    assert_eq!(mmu.take_serial(), b"Passed".to_vec());
    assert!(mmu.take_serial().is_empty());
}
