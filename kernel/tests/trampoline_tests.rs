use shared_process::*;

use dsemul::arch_impl::mips::insn::encode_addiupc;
use dsemul::arch_impl::mips::{BD_COOKIE, BREAK_MATH, MM_NOP16};
use dsemul::arch_impl::{CacheOp, CacheOps, HostCache};
use dsemul::dsemul::StackPlacement;
use dsemul::memory::uaccess::{get_user_u16, get_user_u32, get_user_u64, put_user_u16};
use dsemul::memory::Protection;
use dsemul::{DsemulError, Emulation, Endian, ErrorKind, PlatformConfig, TrapResolution};

fn little() -> PlatformConfig {
    PlatformConfig::default().with_endian(Endian::Little)
}

/// No-op delay slots finish without touching scratch memory
#[test]
fn test_noop_delay_slots() {
    println!("Testing no-op delay slots...");

    let mut process = Process::with_region(little());
    assert_eq!(process.emulate(Process::slot(0, 0x40_1008)), Ok(Emulation::Completed));
    assert_eq!(process.frame.cp0_epc, 0x40_1008);

    process.frame.cp0_epc = BRANCH_PC | 1;
    assert_eq!(
        process.emulate(Process::slot(MM_NOP16 << 16 | 0x1234, 0x40_1006)),
        Ok(Emulation::Completed)
    );
    assert_eq!(process.frame.cp0_epc, 0x40_1006);

    // MM_NOP16 only means nop in ISA16 mode
    process.frame.cp0_epc = BRANCH_PC;
    let result = process.emulate(Process::slot(MM_NOP16 << 16, 0x40_1008));
    assert!(matches!(result, Ok(Emulation::Trampoline { .. })));

    assert_eq!(process.emu.stats().ds_emul, 0);
    println!("✅ No-op delay slot test passed");
}

/// ADDIUPC is completed as a register write, with no memory traffic
#[test]
fn test_addiupc_register_write() {
    println!("Testing ADDIUPC short-circuit...");

    let mut process = Process::with_region(little());
    let continuation = 0x40_1006;

    process.frame.cp0_epc = BRANCH_PC | 1;
    assert_eq!(
        process.emulate(Process::slot(encode_addiupc(3, -8), continuation)),
        Ok(Emulation::Completed)
    );
    assert_eq!(process.frame.regs[3], 0x40_1004 - 32);
    assert_eq!(process.frame.cp0_epc, continuation);

    process.frame.cp0_epc = BRANCH_PC | 1;
    process.emulate(Process::slot(encode_addiupc(1, 0x100), continuation)).unwrap();
    assert_eq!(process.frame.regs[17], 0x40_1004 + 0x400);

    assert!(process.cache.ops().is_empty(), "cache touched");
    assert_eq!(process.region_offset(), PAGE_SIZE as usize);
    println!("✅ ADDIUPC test passed");
}

/// Build, run, trap and resume through the shared region
#[test]
fn test_region_round_trip() {
    println!("Testing shared region round trip...");

    let mut process = Process::with_region(little());
    let region_end = REGION_BASE + PAGE_SIZE;

    let emulation = process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    assert_eq!(emulation, Emulation::Trampoline { frame: region_end - 40 });
    assert_eq!(process.region_offset(), PAGE_SIZE as usize - 40);

    let region = process.emu.scratch_region().unwrap();
    let mut word = [0u8; 4];
    region.read(region_end - 40, &mut word).unwrap();
    assert_eq!(u32::from_le_bytes(word), FPU_INSN);
    region.read(region_end - 36, &mut word).unwrap();
    assert_eq!(u32::from_le_bytes(word), BREAK_MATH);
    region.read(region_end - 32, &mut word).unwrap();
    assert_eq!(u32::from_le_bytes(word), BD_COOKIE);

    process.step_over_instruction();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::Handled)
    );
    assert_eq!(process.frame.cp0_epc, 0x40_1008);
    assert_eq!(process.region_offset(), PAGE_SIZE as usize);
    assert_eq!(process.emu.stats().ds_emul, 1);
    println!("✅ Shared region round trip test passed");
}

/// Build, run, trap and resume through the thread stack
#[test]
fn test_stack_round_trip() {
    println!("Testing stack round trip...");

    let mut process = Process::new(little());
    let fr = StackPlacement::frame_addr(STACK_TOP);

    let emulation = process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    assert_eq!(emulation, Emulation::Trampoline { frame: fr });
    assert_eq!(get_user_u32(&process.mem, fr, Endian::Little), Ok(FPU_INSN));
    assert_eq!(get_user_u64(&process.mem, fr + 16, Endian::Little), Ok(0x40_1008));
    assert_eq!(get_user_u64(&process.mem, fr + 24, Endian::Little), Ok(BRANCH_TARGET));
    assert_eq!(get_user_u64(&process.mem, fr + 32, Endian::Little), Ok(LINK));
    assert_eq!(process.cache.ops(), [CacheOp::Line { addr: fr }]);

    process.step_over_instruction();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::Handled)
    );
    assert_eq!(process.frame.cp0_epc, 0x40_1008);
    println!("✅ Stack round trip test passed");
}

/// Frames built while earlier ones are pending resolve newest first
#[test]
fn test_nested_frames() {
    println!("Testing nested frames...");

    let mut process = Process::with_region(little());
    let mut pending = Vec::new();
    for depth in 0..8u64 {
        process.frame.cp0_epc = BRANCH_PC + depth * 0x10;
        process.emulate(Process::slot(FPU_INSN, 0x40_5000 + depth * 8)).unwrap();
        pending.push((process.frame.clone(), 0x40_5000 + depth * 8));
    }
    assert_eq!(process.emu.scratch_region().unwrap().depth(), 8);

    while let Some((frame, continuation)) = pending.pop() {
        process.frame = frame;
        process.step_over_instruction();
        assert_eq!(
            process.emu.resolve_trap(&mut process.frame, &process.mem),
            Ok(TrapResolution::Handled)
        );
        assert_eq!(process.frame.cp0_epc, continuation);
    }
    assert_eq!(process.region_offset(), PAGE_SIZE as usize);
    println!("✅ Nested frames test passed");
}

/// A full region refuses the next frame without moving the offset
#[test]
fn test_region_exhaustion() {
    println!("Testing scratch region exhaustion...");

    let mut process = Process::with_region(little());
    let capacity = process.emu.scratch_region().unwrap().capacity();
    assert_eq!(capacity, 102);

    for _ in 0..capacity {
        process.frame.cp0_epc = BRANCH_PC;
        process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    }
    let offset = process.region_offset();
    assert_eq!(offset, 16 + (PAGE_SIZE as usize - 16) % 40);

    process.frame.cp0_epc = BRANCH_PC;
    let err = process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap_err();
    assert_eq!(err, DsemulError::ScratchExhausted);
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert_eq!(process.region_offset(), offset);
    assert_eq!(process.frame.cp0_epc, BRANCH_PC);
    assert_eq!(process.emu.stats().errors, 1);
    println!("✅ Region exhaustion test passed");
}

/// Corrupted frames are left to the generic breakpoint handling
#[test]
fn test_corrupted_frame_not_handled() {
    println!("Testing corrupted frames...");

    let mut process = Process::with_region(little());
    process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    let fr = process.frame.cp0_epc;
    process.step_over_instruction();

    let region = process.emu.scratch_region().unwrap();
    region.poke(fr + 4, &0x0000_000du32.to_le_bytes()).unwrap();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::NotHandled)
    );
    assert_eq!(process.frame.cp0_epc, fr + 4);
    assert_eq!(process.region_offset(), PAGE_SIZE as usize - 40);

    // A marker alone is not enough
    region.poke(fr + 4, &BREAK_MATH.to_le_bytes()).unwrap();
    region.poke(fr + 8, &0u32.to_le_bytes()).unwrap();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::NotHandled)
    );

    region.poke(fr + 8, &BD_COOKIE.to_le_bytes()).unwrap();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::Handled)
    );
    println!("✅ Corrupted frame test passed");
}

/// A trap replayed after its frame was released is rejected
#[test]
fn test_replayed_trap_underflows() {
    println!("Testing replayed trap...");

    let mut process = Process::with_region(little());
    process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    process.step_over_instruction();
    let marker = process.frame.cp0_epc;
    process.emu.resolve_trap(&mut process.frame, &process.mem).unwrap();

    process.frame.cp0_epc = marker;
    let err = process
        .emu
        .resolve_trap(&mut process.frame, &process.mem)
        .unwrap_err();
    assert_eq!(err, DsemulError::ScratchUnderflow);
    assert_eq!(err.kind(), ErrorKind::Corruption);
    assert_eq!(process.region_offset(), PAGE_SIZE as usize);
    println!("✅ Replayed trap test passed");
}

/// Unusable stacks fail with an access violation
#[test]
fn test_unusable_stack() {
    println!("Testing unusable stacks...");

    let mut process = Process::new(little());
    assert!(process.mem.protect(STACK_TOP - PAGE_SIZE, Protection::READ));
    let err = process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap_err();
    assert!(matches!(err, DsemulError::StackWriteFault { .. }));
    assert_eq!(err.kind(), ErrorKind::AccessViolation);

    process.frame.regs[29] = 0;
    let err = process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap_err();
    assert!(matches!(err, DsemulError::StackNotWritable { .. }));
    assert_eq!(process.frame.cp0_epc, BRANCH_PC);
    assert!(process.cache.ops().is_empty());
    println!("✅ Unusable stack test passed");
}

/// A stack frame that became unreadable is not treated as ours
#[test]
fn test_unreadable_stack_frame() {
    println!("Testing unreadable stack frame...");

    let mut process = Process::new(little());
    process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    process.step_over_instruction();
    assert!(process.mem.protect(STACK_TOP - PAGE_SIZE, Protection::NONE));

    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::NotHandled)
    );
    println!("✅ Unreadable stack frame test passed");
}

/// ISA16 frames store instruction halves high first and keep the mode bit
#[test]
fn test_isa16_big_endian_frame() {
    println!("Testing ISA16 frame on a big-endian CPU...");

    let mut process = Process::new(PlatformConfig::default().with_endian(Endian::Big));
    process.frame.cp0_epc = BRANCH_PC | 1;
    let fr = StackPlacement::frame_addr(STACK_TOP);

    process.emulate(Process::slot(FPU_INSN, 0x40_1006)).unwrap();
    assert_eq!(process.frame.cp0_epc, fr | 1);
    assert_eq!(get_user_u16(&process.mem, fr, Endian::Big), Ok((FPU_INSN >> 16) as u16));
    assert_eq!(get_user_u16(&process.mem, fr + 2, Endian::Big), Ok(FPU_INSN as u16));
    assert_eq!(get_user_u16(&process.mem, fr + 4, Endian::Big), Ok((BREAK_MATH >> 16) as u16));
    assert_eq!(get_user_u16(&process.mem, fr + 6, Endian::Big), Ok(BREAK_MATH as u16));
    assert_eq!(get_user_u32(&process.mem, fr + 8, Endian::Big), Ok(BD_COOKIE));

    process.step_over_instruction();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::Handled)
    );
    assert_eq!(process.frame.cp0_epc, 0x40_1006);
    println!("✅ ISA16 big-endian frame test passed");
}

/// A damaged half of an ISA16 marker is enough to reject the frame
#[test]
fn test_isa16_torn_marker_not_handled() {
    println!("Testing ISA16 frame with a damaged marker half...");

    let mut process = Process::new(little());
    process.frame.cp0_epc = BRANCH_PC | 1;
    let fr = StackPlacement::frame_addr(STACK_TOP);

    process.emulate(Process::slot(FPU_INSN, 0x40_1006)).unwrap();
    assert_eq!(get_user_u16(&process.mem, fr + 6, Endian::Little), Ok(BREAK_MATH as u16));
    put_user_u16(&mut process.mem, fr + 6, 0, Endian::Little).unwrap();

    process.step_over_instruction();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::NotHandled)
    );
    assert_eq!(process.frame.cp0_epc, (fr + 4) | 1);
    println!("✅ ISA16 damaged marker test passed");
}

/// Aliasing data caches get the whole frame synchronized
#[test]
fn test_aliasing_cache_sync() {
    println!("Testing cache sync on aliasing caches...");

    let mut process = Process::with_region(little().with_dcache_aliases(true));
    let emulation = process.emulate(Process::slot(FPU_INSN, 0x40_1008)).unwrap();
    let Emulation::Trampoline { frame } = emulation else {
        panic!("expected a trampoline, got {:?}", emulation);
    };
    assert_eq!(process.cache.ops(), [CacheOp::Range { start: frame, len: 40 }]);

    // Resolving reads the frame back but writes no code
    process.cache.clear();
    process.step_over_instruction();
    assert_eq!(
        process.emu.resolve_trap(&mut process.frame, &process.mem),
        Ok(TrapResolution::Handled)
    );
    assert!(process.cache.ops().is_empty());
    println!("✅ Aliasing cache sync test passed");
}

/// The host cache implementation accepts code written at run time
#[test]
fn test_host_cache_sync() {
    println!("Testing host cache maintenance...");

    let cache = unsafe { HostCache::new() };
    let code = vec![0u8; 256];
    let start = code.as_ptr() as u64;

    cache.synchronize_instructions(start, code.len());
    cache.synchronize_line(start + 64);
    println!("✅ Host cache test passed");
}
