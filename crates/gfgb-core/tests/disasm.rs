use gfgb_core::{
    decode::decode_slice,
    disasm::{disassemble_program, disassemble_range, render_at},
    mmu::Mmu,
    symbols::DebugSymbolTable,
};

// Start of a small RGBDS program: sound off, LCD off, copy a sprite, clear
// the tilemap, place one tile, turn the LCD on and set BGP.
const SECTION: [u8; 57] = [
    0x3e, 0x00, 0xea, 0x26, 0xff, 0xcd, 0x89, 0x01, 0xcd, 0xb9, 0x01, 0x3e, 0x10, 0xf5, 0x21,
    0x10, 0x90, 0x01, 0xc8, 0x01, 0xcd, 0x92, 0x01, 0xf1, 0x01, 0x00, 0x98, 0xc5, 0x3e, 0x00,
    0xf5, 0x01, 0x00, 0x04, 0xc5, 0xcd, 0x9e, 0x01, 0xc1, 0xf1, 0xc1, 0x21, 0x04, 0x98, 0x36,
    0x01, 0xcd, 0xbf, 0x01, 0x3e, 0xe4, 0xea, 0x47, 0xff, 0xcd, 0xc5, 0x01,
];

const SECTION_LISTING: &str = concat!(
    "  $0150: LD A, $00\n",
    "  $0152: LD [$FF26], A\n",
    "  $0155: CALL $0189\n",
    "  $0158: CALL $01B9\n",
    "  $015B: LD A, $10\n",
    "  $015D: PUSH AF\n",
    "  $015E: LD HL, $9010\n",
    "  $0161: LD BC, $01C8\n",
    "  $0164: CALL $0192\n",
    "  $0167: POP AF\n",
    "  $0168: LD BC, $9800\n",
    "  $016B: PUSH BC\n",
    "  $016C: LD A, $00\n",
    "  $016E: PUSH AF\n",
    "  $016F: LD BC, $0400\n",
    "  $0172: PUSH BC\n",
    "  $0173: CALL $019E\n",
    "  $0176: POP BC\n",
    "  $0177: POP AF\n",
    "  $0178: POP BC\n",
    "  $0179: LD HL, $9804\n",
    "  $017C: LD [HL], $01\n",
    "  $017E: CALL $01BF\n",
    "  $0181: LD A, $E4\n",
    "  $0183: LD [$FF47], A\n",
    "  $0186: CALL $01C5\n",
);

const SYMS: &str = "\
00:0150 SimpleSprite
00:0189 WaitForVBlank
00:0192 CopySprite
00:019e ClearMem
00:01b9 LCDOff
00:01bf LCDOn
00:01c5 Done
00:01c8 DoggoSprite
";

fn rom_with_section() -> Mmu {
    let mut rom = vec![0u8; 0x8000];
    rom[0x0150..0x0150 + SECTION.len()].copy_from_slice(&SECTION);
    let mut mmu = Mmu::new();
    mmu.load_rom(&rom).unwrap();
    mmu
}

fn listing(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
    let mut out = Vec::new();
    f(&mut out).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn section_listing_matches_assembler_source() {
    let mmu = rom_with_section();
    let text = listing(|out| disassemble_range(&mmu, 0x0150..0x0150 + SECTION.len() as u16, None, out));
    assert_eq!(text, SECTION_LISTING);
}

#[test]
fn section_decodes_to_exact_byte_count() {
    let mut pc = 0u16;
    let mut count = 0;
    while usize::from(pc) < SECTION.len() {
        let fetched = decode_slice(&SECTION[usize::from(pc)..], pc);
        assert!(!fetched.instruction.is_invalid());
        pc = fetched.next_pc;
        count += 1;
    }
    assert_eq!(usize::from(pc), SECTION.len());
    assert_eq!(count, 26);
}

#[test]
fn call_targets_use_symbol_names() {
    let mmu = rom_with_section();
    let (symbols, _) = DebugSymbolTable::parse(SYMS);
    let text = listing(|out| disassemble_range(&mmu, 0x0150..0x015B, Some(&symbols), out));
    assert_eq!(
        text,
        "  $0150: LD A, $00\n  $0152: LD [$FF26], A\n  $0155: CALL WaitForVBlank\n  $0158: CALL LCDOff\n"
    );
}

#[test]
fn relative_jumps_render_absolute_targets() {
    // JR NZ,-2 at $0200 jumps to itself
    let fetched = decode_slice(&[0x20, 0xFE], 0x0200);
    assert_eq!(fetched.instruction.to_string(), "JR NZ, -2");
    assert_eq!(render_at(&fetched.instruction, fetched.next_pc, None), "JR NZ, $0200");

    let (symbols, _) = DebugSymbolTable::parse("00:0210 Loop\n");
    let fetched = decode_slice(&[0x18, 0x0E], 0x0200);
    assert_eq!(
        render_at(&fetched.instruction, fetched.next_pc, Some(&symbols)),
        "JR Loop"
    );
}

#[test]
fn data_operands_are_not_substituted() {
    // LD BC,$01C8 loads an address but is not a branch
    let (symbols, _) = DebugSymbolTable::parse(SYMS);
    let fetched = decode_slice(&[0x01, 0xC8, 0x01], 0x0161);
    assert_eq!(
        render_at(&fetched.instruction, fetched.next_pc, Some(&symbols)),
        "LD BC, $01C8"
    );
}

#[test]
fn program_without_symbols_covers_bank0_from_entry() {
    let mmu = rom_with_section();
    let text = listing(|out| disassemble_program(&mmu, None, out));
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("RomStart:"));
    assert_eq!(lines.next(), Some("  $0100: NOP"));
    assert!(text.contains("  $0150: LD A, $00\n"));
    assert!(text.trim_end().ends_with("$3FFF: NOP"));
    assert!(!text.contains("BootRom:"));
}

#[test]
fn program_with_symbols_lists_each_symbol() {
    let mmu = rom_with_section();
    let (symbols, _) = DebugSymbolTable::parse("00:0150 Start\n00:0155 Tail\n");
    let text = listing(|out| disassemble_program(&mmu, Some(&symbols), out));
    assert_eq!(
        text,
        "RomStart:\n  Start:\n    $0150: LD A, $00\n    $0152: LD [$FF26], A\n  Tail:\n"
    );
}

#[test]
fn program_with_boot_rom_lists_overlay_first() {
    let mut mmu = rom_with_section();
    mmu.load_boot_rom(&[0x31, 0xFE, 0xFF, 0xAF]).unwrap();
    let text = listing(|out| disassemble_program(&mmu, None, out));
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("BootRom:"));
    assert_eq!(lines.next(), Some("  $0000: LD SP, $FFFE"));
    assert_eq!(lines.next(), Some("  $0003: XOR A, A"));
    assert!(text.contains("\nRomStart:\n"));

    // boot symbols replace the raw overlay dump
    let (symbols, _) =
        DebugSymbolTable::parse("BOOT:0000 EntryPoint\nBOOT:0004 Clear\n00:0150 Main\n");
    let text = listing(|out| disassemble_program(&mmu, Some(&symbols), out));
    assert_eq!(
        text,
        "RomStart:\n  EntryPoint:\n    $0000: LD SP, $FFFE\n    $0003: XOR A, A\n  Clear:\n  Main:\n"
    );
}
