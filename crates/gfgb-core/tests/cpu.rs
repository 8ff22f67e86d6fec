use gfgb_core::{
    cpu::Cpu,
    error::CpuError,
    gameboy::GameBoy,
    mmu::Mmu,
    registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Flag, R16},
};

const START: u16 = 0xC000;

/// Flat-memory CPU with `program` placed at `START`.
fn setup(program: &[u8]) -> (Cpu, Mmu) {
    let mut mmu = Mmu::new_flat();
    for (i, &byte) in program.iter().enumerate() {
        mmu.write8(START + i as u16, byte);
    }
    let mut cpu = Cpu::new();
    cpu.regs.pc = START;
    cpu.regs.sp = 0xDFFE;
    (cpu, mmu)
}

#[test]
fn add_a_b() {
    let (mut cpu, mut mmu) = setup(&[0x80]);
    cpu.regs.a = 0x3C;
    cpu.regs.b = 0x3C;
    cpu.regs.set_f(0);

    let cycles = cpu.step(&mut mmu).unwrap();
    assert_eq!(cycles, 4);
    assert_eq!(cpu.regs.a, 0x78);
    // 0xC + 0xC carries out of bit 3
    assert_eq!(cpu.regs.f(), FLAG_H);
    assert_eq!(cpu.regs.pc, START + 1);
}

#[test]
fn add_a_b_without_carries() {
    let (mut cpu, mut mmu) = setup(&[0x80]);
    cpu.regs.a = 0x34;
    cpu.regs.b = 0x43;
    cpu.regs.set_f(FLAG_N | FLAG_C);
    cpu.step(&mut mmu).unwrap();
    assert_eq!(cpu.regs.a, 0x77);
    assert_eq!(cpu.regs.f(), 0);
}

#[test]
fn add_sets_half_and_full_carry() {
    let (mut cpu, mut mmu) = setup(&[0x80]);
    cpu.regs.a = 0xFF;
    cpu.regs.b = 0x01;
    cpu.step(&mut mmu).unwrap();
    assert_eq!(cpu.regs.a, 0x00);
    assert_eq!(cpu.regs.f(), FLAG_Z | FLAG_H | FLAG_C);
}

#[test]
fn bit_7_h_set() {
    let (mut cpu, mut mmu) = setup(&[0xCB, 0x7C]);
    cpu.regs.h = 0x80;
    cpu.regs.set_f(FLAG_C);

    let cycles = cpu.step(&mut mmu).unwrap();
    assert_eq!(cycles, 8);
    assert!(!cpu.regs.flag(Flag::Z));
    assert!(cpu.regs.flag(Flag::H));
    assert!(!cpu.regs.flag(Flag::N));
    assert!(cpu.regs.flag(Flag::C));
    assert_eq!(cpu.regs.pc, START + 2);
}

#[test]
fn bit_hl_takes_12_cycles() {
    let (mut cpu, mut mmu) = setup(&[0xCB, 0x46]);
    cpu.regs.set16(R16::HL, 0xD000);
    mmu.write8(0xD000, 0x00);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert!(cpu.regs.flag(Flag::Z));
}

#[test]
fn xor_a_clears_everything_but_zero() {
    let (mut cpu, mut mmu) = setup(&[0xAF]);
    cpu.regs.a = 0x5A;
    cpu.regs.set_f(FLAG_N | FLAG_H | FLAG_C);
    cpu.step(&mut mmu).unwrap();
    assert_eq!(cpu.regs.a, 0);
    assert_eq!(cpu.regs.f(), FLAG_Z);
}

#[test]
fn ld_a_hli_and_hld_adjust_hl() {
    // LD A,[HL+] ; LD A,[HL-] ; LD [HL+],A
    let (mut cpu, mut mmu) = setup(&[0x2A, 0x3A, 0x22]);
    mmu.write8(0xD000, 0x11);
    mmu.write8(0xD001, 0x22);
    cpu.regs.set16(R16::HL, 0xD000);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 8);
    assert_eq!(cpu.regs.a, 0x11);
    assert_eq!(cpu.regs.get16(R16::HL), 0xD001);

    cpu.step(&mut mmu).unwrap();
    assert_eq!(cpu.regs.a, 0x22);
    assert_eq!(cpu.regs.get16(R16::HL), 0xD000);

    cpu.step(&mut mmu).unwrap();
    assert_eq!(mmu.read8(0xD000), 0x22);
    assert_eq!(cpu.regs.get16(R16::HL), 0xD001);
}

#[test]
fn ld_hl_indirect_from_h_uses_old_h() {
    // LD [HL],H
    let (mut cpu, mut mmu) = setup(&[0x74]);
    cpu.regs.set16(R16::HL, 0xD0AB);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 8);
    assert_eq!(mmu.read8(0xD0AB), 0xD0);
}

#[test]
fn ei_takes_effect_after_following_instruction() {
    // EI ; NOP ; NOP
    let (mut cpu, mut mmu) = setup(&[0xFB, 0x00, 0x00]);
    cpu.step(&mut mmu).unwrap();
    assert!(!cpu.regs.ime);
    assert!(cpu.ei_pending);

    cpu.step(&mut mmu).unwrap();
    assert!(cpu.regs.ime);
    assert!(!cpu.ei_pending);
}

#[test]
fn di_right_after_ei_keeps_interrupts_off() {
    let (mut cpu, mut mmu) = setup(&[0xFB, 0xF3, 0x00]);
    cpu.step(&mut mmu).unwrap();
    cpu.step(&mut mmu).unwrap();
    cpu.step(&mut mmu).unwrap();
    assert!(!cpu.regs.ime);
    assert!(!cpu.ei_pending);
}

#[test]
fn reti_enables_immediately() {
    let (mut cpu, mut mmu) = setup(&[0xD9]);
    mmu.write16(0xDFFE, 0x1234);
    let cycles = cpu.step(&mut mmu).unwrap();
    assert_eq!(cycles, 16);
    assert!(cpu.regs.ime);
    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.regs.sp, 0xE000);
}

#[test]
fn call_and_ret_round_trip() {
    // CALL $C010 ; ... ; at $C010: RET
    let mut program = vec![0xCD, 0x10, 0xC0];
    program.resize(0x10, 0x00);
    program.push(0xC9);
    let (mut cpu, mut mmu) = setup(&program);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 24);
    assert_eq!(cpu.regs.pc, 0xC010);
    assert_eq!(cpu.regs.sp, 0xDFFC);
    assert_eq!(mmu.read16(0xDFFC), START + 3);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 16);
    assert_eq!(cpu.regs.pc, START + 3);
    assert_eq!(cpu.regs.sp, 0xDFFE);
}

#[test]
fn conditional_branches_report_both_timings() {
    // JR NZ,+2 ; JP Z,$0000 ; RET C ; CALL NC,$C100
    let (mut cpu, mut mmu) = setup(&[0x20, 0x02, 0xCA, 0x00, 0x00, 0xD8, 0xD4, 0x00, 0xC1]);

    cpu.regs.set_f(FLAG_Z);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 8);
    assert_eq!(cpu.regs.pc, START + 2);

    cpu.regs.set_f(0);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(cpu.regs.pc, START + 5);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 8);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 24);
    assert_eq!(cpu.regs.pc, 0xC100);
}

#[test]
fn jr_backwards() {
    // NOP ; JR -3
    let (mut cpu, mut mmu) = setup(&[0x00, 0x18, 0xFD]);
    cpu.step(&mut mmu).unwrap();
    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(cpu.regs.pc, START);
}

#[test]
fn push_pop_af_masks_low_nibble() {
    // PUSH BC ; POP AF
    let (mut cpu, mut mmu) = setup(&[0xC5, 0xF1]);
    cpu.regs.set16(R16::BC, 0x12FF);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 16);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(cpu.regs.a, 0x12);
    assert_eq!(cpu.regs.f(), 0xF0);
}

#[test]
fn add_hl_uses_bit_11_and_15() {
    // ADD HL,DE
    let (mut cpu, mut mmu) = setup(&[0x19]);
    cpu.regs.set16(R16::HL, 0x8FFF);
    cpu.regs.set16(R16::DE, 0x8001);
    cpu.regs.set_f(FLAG_Z);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 8);
    assert_eq!(cpu.regs.get16(R16::HL), 0x1000);
    assert_eq!(cpu.regs.f(), FLAG_Z | FLAG_H | FLAG_C);
}

#[test]
fn ld_hl_sp_offset_flags_from_low_byte() {
    // LD HL,SP-1
    let (mut cpu, mut mmu) = setup(&[0xF8, 0xFF]);
    cpu.regs.sp = 0x0001;
    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(cpu.regs.get16(R16::HL), 0x0000);
    assert_eq!(cpu.regs.f(), FLAG_H | FLAG_C);
}

#[test]
fn ld_n16_sp_stores_little_endian() {
    let (mut cpu, mut mmu) = setup(&[0x08, 0x00, 0xD0]);
    cpu.regs.sp = 0xABCD;
    assert_eq!(cpu.step(&mut mmu).unwrap(), 20);
    assert_eq!(mmu.read8(0xD000), 0xCD);
    assert_eq!(mmu.read8(0xD001), 0xAB);
}

#[test]
fn ldh_uses_high_page() {
    // LDH [$80],A ; LDH A,[C]
    let (mut cpu, mut mmu) = setup(&[0xE0, 0x80, 0xF2]);
    cpu.regs.a = 0x5A;
    cpu.regs.c = 0x80;
    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(mmu.read8(0xFF80), 0x5A);
    cpu.regs.a = 0;
    assert_eq!(cpu.step(&mut mmu).unwrap(), 8);
    assert_eq!(cpu.regs.a, 0x5A);
}

#[test]
fn inc_dec_hl_indirect() {
    // INC [HL] ; DEC [HL]
    let (mut cpu, mut mmu) = setup(&[0x34, 0x35]);
    cpu.regs.set16(R16::HL, 0xD000);
    mmu.write8(0xD000, 0x0F);
    cpu.regs.set_f(FLAG_C);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(mmu.read8(0xD000), 0x10);
    assert_eq!(cpu.regs.f(), FLAG_H | FLAG_C);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 12);
    assert_eq!(mmu.read8(0xD000), 0x0F);
    assert_eq!(cpu.regs.f(), FLAG_N | FLAG_H | FLAG_C);
}

#[test]
fn rst_pushes_return_address() {
    let (mut cpu, mut mmu) = setup(&[0xFF]);
    assert_eq!(cpu.step(&mut mmu).unwrap(), 16);
    assert_eq!(cpu.regs.pc, 0x0038);
    assert_eq!(mmu.read16(cpu.regs.sp), START + 1);
}

#[test]
fn flags_low_nibble_stays_clear_across_alu_ops() {
    // a spread of ALU, rotate and misc ops
    let program = [
        0x87, 0x8F, 0x97, 0x9F, 0xA7, 0xB7, 0xBF, 0x3C, 0x3D, 0x07, 0x0F, 0x17, 0x1F, 0x27, 0x2F,
        0x37, 0x3F, 0xCB, 0x37, 0xCB, 0x27, 0xC6, 0x0F, 0xDE, 0xF1,
    ];
    let (mut cpu, mut mmu) = setup(&program);
    cpu.regs.a = 0x9B;
    let end = START + program.len() as u16;
    while cpu.regs.pc < end {
        cpu.step(&mut mmu).unwrap();
        assert_eq!(cpu.regs.f() & 0x0F, 0, "after op at {:04X}", cpu.regs.pc);
    }
}

#[test]
fn invalid_opcode_is_an_error_and_pc_stays() {
    for opcode in [0xD3u8, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD] {
        let (mut cpu, mut mmu) = setup(&[opcode]);
        match cpu.step(&mut mmu) {
            Err(CpuError::InvalidOpcode { opcode: op, pc }) => {
                assert_eq!(op, opcode);
                assert_eq!(pc, START);
            }
            other => panic!("{opcode:02X}: expected InvalidOpcode, got {other:?}"),
        }
        assert_eq!(cpu.regs.pc, START);
    }
}

#[test]
fn halt_idles_until_interrupt_pending() {
    let (mut cpu, mut mmu) = setup(&[0x76, 0x00]);
    cpu.step(&mut mmu).unwrap();
    assert!(cpu.halted);

    assert_eq!(cpu.step(&mut mmu).unwrap(), 4);
    assert_eq!(cpu.regs.pc, START + 1);

    mmu.ie_reg = 0x04;
    mmu.if_reg = 0x04;
    cpu.step(&mut mmu).unwrap();
    assert!(!cpu.halted);
    assert_eq!(cpu.regs.pc, START + 2);
}

#[test]
fn interrupt_dispatch_pushes_pc_and_clears_if() {
    let mut gb = GameBoy::new();
    gb.cpu.regs.pc = 0xC000;
    gb.cpu.regs.sp = 0xDFFE;
    gb.cpu.regs.ime = true;
    gb.write8(0xC000, 0x00);
    gb.write8(0xFFFF, 0x05);
    gb.write8(0xFF0F, 0x05);

    let cycles = gb.step().unwrap();
    assert_eq!(cycles, 4 + 20);
    // VBlank wins over timer
    assert_eq!(gb.cpu.regs.pc, 0x0040);
    assert!(!gb.cpu.regs.ime);
    assert_eq!(gb.read8(0xFF0F) & 0x1F, 0x04);
    assert_eq!(gb.read16(0xDFFC), 0xC001);
}

#[test]
fn timer_overflow_raises_interrupt_through_machine() {
    let mut gb = GameBoy::new();
    gb.cpu.regs.pc = 0xC000;
    // fill WRAM with NOPs
    for addr in 0xC000..0xC100u16 {
        gb.write8(addr, 0x00);
    }
    gb.write8(0xFF06, 0x00);
    gb.write8(0xFF05, 0xFF);
    // 16 clocks per tick
    gb.write8(0xFF07, 0x05);
    for _ in 0..4 {
        gb.step().unwrap();
    }
    assert_eq!(gb.read8(0xFF0F) & 0x04, 0x04);
}

#[test]
fn boot_rom_starts_at_zero_and_reset_keeps_it() {
    let mut gb = GameBoy::new();
    gb.load_rom(&[0u8; 0x8000]).unwrap();
    assert_eq!(gb.cpu.regs.pc, 0x0100);

    // LD A,$01 ; LDH [$50],A
    gb.load_boot_rom(&[0x3E, 0x01, 0xE0, 0x50]).unwrap();
    assert_eq!(gb.cpu.regs.pc, 0x0000);
    gb.step().unwrap();
    gb.step().unwrap();
    assert!(!gb.mmu.boot_mapped);

    gb.reset();
    assert!(gb.mmu.boot_mapped);
    assert_eq!(gb.cpu.regs.pc, 0x0000);
    assert_eq!(gb.read8(0x0000), 0x3E);
}
