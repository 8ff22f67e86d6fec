//! Game Boy (DMG) SM83 CPU core.
//!
//! This crate contains the platform-agnostic emulator logic: register file,
//! memory map, instruction decoder, executor and disassembler. Frontends live
//! in separate crates and drive the core via the [`gameboy`] facade.

/// SM83 step driver: EI latch, HALT/STOP and interrupt dispatch.
pub mod cpu;

/// Bit-field instruction decoder for the primary and CB-prefixed tables.
pub mod decode;

/// Text rendering of decoded instructions and whole-program listings.
pub mod disasm;

/// Error types shared across the crate.
pub mod error;

/// Per-instruction semantics and cycle counts.
pub mod execute;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Memory map and I/O register plumbing.
pub mod mmu;

/// Register file and operand register encodings.
pub mod registers;

/// Serial port registers.
pub mod serial;

/// Single-step test vectors.
pub mod sst;

/// RGBDS debug symbol table.
pub mod symbols;

/// Divider/timer unit.
pub mod timer;
