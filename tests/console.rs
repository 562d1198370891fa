use rpsx_core::core::config::VideoStandard;
use rpsx_core::core::gpu::NullGpuSink;
use rpsx_core::core::interlink::BIOS_LEN;
use rpsx_core::core::spu::NullSpuSink;
use rpsx_core::core::{swap_endianness, Console};

/// Builds a BIOS image whose reset vector runs the given hand-assembled
/// program (little-endian words, like a real ROM).
fn bios_with_program(program: &[u32]) -> Vec<u8> {
    let mut bios = vec![0u8; BIOS_LEN];
    for (i, word) in program.iter().enumerate() {
        bios[i * 4..i * 4 + 4].copy_from_slice(&word.to_le_bytes());
    }
    bios
}

fn console_with_program(program: &[u32]) -> Console {
    Console::new(
        bios_with_program(program),
        Box::new(NullGpuSink),
        Box::new(NullSpuSink),
        None,
        VideoStandard::Ntsc,
    )
    .unwrap()
}

fn run_blocks(console: &mut Console, blocks: usize) {
    for _ in 0..blocks {
        console.run_block();
    }
}

/// Jump-to-self at the given KSEG1 address, the usual idle tail of the
/// little test ROMs below.
fn park(address: u32) -> u32 {
    0x0800_0000 | ((address & 0x0FFF_FFFF) >> 2)
}

#[test]
fn cold_boot_reaches_the_post_register() {
    // lui r1, 0x1F80 ; addiu r2, r0, 1 ; sb r2, 0x2041(r1) ; park
    let mut console = console_with_program(&[
        0x3C01_1F80,
        0x2402_0001,
        0xA022_2041,
        park(0xBFC0_000C),
        0x0000_0000,
    ]);
    assert_eq!(console.cpu.pc(), 0xBFC0_0000, "first fetch at the reset vector");
    run_blocks(&mut console, 8);
    assert_eq!(console.interlink.post(), 0x01, "boot progress reached POST");
}

#[test]
fn gte_pipeline_runs_from_machine_code() {
    // enable COP2, load an identity-ish setup and push one vertex through
    // the perspective transform, then store SZ3 to RAM
    let mut console = console_with_program(&[
        0x3C01_4000, // lui r1, 0x4000        (SR.CU2)
        0x4081_6000, // mtc0 r1, sr
        0x2402_1000, // addiu r2, r0, 0x1000
        0x48C2_2000, // ctc2 r2, cr4          (R33 = 1.0)
        0x4882_0800, // mtc2 r2, dr1          (VZ0 = 0x1000)
        0x2403_0200, // addiu r3, r0, 0x200
        0x48C3_D000, // ctc2 r3, cr26         (H = 0x200)
        0x4A08_0001, // rtps (sf=1)
        0x4804_9800, // mfc2 r4, dr19         (SZ3)
        0xAC04_0100, // sw r4, 0x100(r0)
        park(0xBFC0_0028),
        0x0000_0000,
    ]);
    run_blocks(&mut console, 8);
    let stored = swap_endianness(console.interlink.read_word(0x100));
    assert_eq!(stored, 0x1000, "SZ3 of the identity transform");
}

#[test]
fn timer2_interrupt_preempts_the_idle_loop() {
    // plant a parking loop at the exception vector, set timer 2 to CPU/8
    // with target 100 and IRQ, unmask it, enable interrupts, then spin
    let mut console = console_with_program(&[
        0x3C01_1F80, // lui r1, 0x1F80
        0x3C03_0800, // lui r3, 0x0800
        0x3463_0020, // ori r3, r3, 0x20      (j 0x80000080)
        0xAC03_0080, // sw r3, 0x80(r0)
        0x2402_0064, // addiu r2, r0, 100
        0xAC22_1128, // sw r2, 0x1128(r1)    (T2 target)
        0x2402_0218, // addiu r2, r0, 0x218
        0xAC22_1124, // sw r2, 0x1124(r1)    (T2 mode: /8, reset+IRQ on target)
        0x2402_0040, // addiu r2, r0, 0x40
        0xAC22_1074, // sw r2, 0x1074(r1)    (I_MASK bit 6)
        0x2402_0401, // addiu r2, r0, 0x401
        0x4082_6000, // mtc0 r2, sr          (IEc + IM2)
        park(0xBFC0_0030),
        0x0000_0000,
    ]);
    run_blocks(&mut console, 1500);
    let cause = console.cpu.cop0().cause();
    assert_eq!((cause >> 2) & 0x1F, 0, "interrupt excode");
    assert_ne!(cause & (1 << 10), 0, "hardware line latched in CAUSE");
    assert_eq!(console.cpu.cop0().read_reg(14), 0xBFC0_0030, "EPC at the loop");
    assert_ne!(
        swap_endianness(console.interlink.irq_status_raw()) & 0x40,
        0,
        "timer 2 bit pending in I_STAT"
    );
}
