mod common;

use common::*;
use patmos_rs::{
    DelayType, Features, Image, Kind, LineEntry, LineMap, LoadError, Op, Process, ProcessConfig, Segment,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn process_at(base: u32, words: &[u32]) -> Process {
    Process::new(Image::from_words(base, words), ProcessConfig::default())
}

#[test]
fn branch_end_to_end() {
    let mut words = vec![NOP; 0x11];
    words[0] = 0x0480_0010; // brnd 0x1040
    let process = process_at(0x1000, &words);

    let br = process.find_inst_at(0x1000).unwrap().unwrap();
    assert!(br.kind().contains(Kind::IS_CONTROL));
    assert_eq!(br.size(), 4);
    assert_eq!(process.delay_slots(&br).unwrap(), 0);
    let target = process.target(&br).unwrap().unwrap();
    assert_eq!(target.address(), 0x1040);
    assert_eq!(process.delay_type(&br), DelayType::Always);
}

#[test]
fn targets_are_decoded_on_demand_and_shared() {
    let mut words = vec![NOP; 8];
    words[0] = cfl_i(0, false, 7); // call 0x1c
    let process = process_at(0, &words);
    let call = process.find_inst_at(0).unwrap().unwrap();
    assert_eq!(process.insts().len(), 1);

    let first = process.target(&call).unwrap().unwrap();
    assert_eq!(first.address(), 0x1c);
    assert_eq!(process.insts().len(), 2);
    let again = process.target(&call).unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &again));
    assert!(Arc::ptr_eq(&first, &process.find_inst_at(0x1c).unwrap().unwrap()));
}

#[test]
fn indirect_and_zero_targets_are_absent() {
    let process = process_at(0, &[cfl_r(1, 1, false, 3, 0), cfl_i(0, false, 0), NOP]);
    let brr = process.find_inst_at(0).unwrap().unwrap();
    assert!(process.target(&brr).unwrap().is_none());
    let call0 = process.find_inst_at(4).unwrap().unwrap();
    assert!(process.target(&call0).unwrap().is_none());
    let nop = process.find_inst_at(8).unwrap().unwrap();
    assert!(process.target(&nop).unwrap().is_none());
    assert_eq!(process.delay_type(&nop), DelayType::None);
}

#[test]
fn target_outside_code_is_a_load_error() {
    let words = [cfl_i(1, false, 0x100), NOP];
    let process = process_at(0, &words);
    let br = process.find_inst_at(0).unwrap().unwrap();
    let err = process.target(&br).unwrap_err();
    assert!(matches!(err, LoadError::MissingTarget { branch: 0, target: 0x400 }));
    assert!(err.to_string().contains("0x00000400"));

    let lenient = Process::new(
        Image::from_words(0, &words),
        ProcessConfig { check_targets: false, ..Default::default() },
    );
    let br = lenient.find_inst_at(0).unwrap().unwrap();
    assert!(lenient.target(&br).unwrap().is_none());
}

#[test]
fn bundle_size_follows_the_high_bit() {
    let process = process_at(0, &[alu_r(0, 1, 2, 3) | BUNDLE, alu_r(0, 4, 5, 6), NOP]);
    assert_eq!(process.info().bundle_size(0).unwrap(), 8);
    assert_eq!(process.info().bundle_size(4).unwrap(), 4);
    assert_eq!(process.info().bundle_size(8).unwrap(), 4);
    assert!(process.info().bundle_size(12).is_err());
}

#[test]
fn delay_slots_count_instructions_not_bundles() {
    let words = [
        cfl_r(0, 0, true, 0, 0), // ret, three delay bundles
        alu_r(0, 1, 2, 3) | BUNDLE,
        alu_r(0, 4, 5, 6),
        NOP,
        alu_l(0, 1, 2),
        0x1234,
        NOP,
    ];
    let process = process_at(0, &words);
    let ret = process.find_inst_at(0).unwrap().unwrap();
    assert_eq!(process.delay_slots(&ret).unwrap(), 4);
    // memoized
    assert_eq!(process.delay_slots(&ret).unwrap(), 4);
}

#[test]
fn two_bundle_branch_delay() {
    let process = process_at(0, &[cfl_i(1, true, 4), NOP | BUNDLE, NOP, NOP, NOP]);
    let br = process.find_inst_at(0).unwrap().unwrap();
    assert_eq!(process.delay_slots(&br).unwrap(), 3);
}

#[test]
fn undecodable_delay_slot_is_a_load_error() {
    let process = process_at(0, &[cfl_i(1, true, 4), NOP, UNKNOWN, NOP, NOP]);
    let br = process.find_inst_at(0).unwrap().unwrap();
    let err = process.delay_slots(&br).unwrap_err();
    assert!(matches!(err, LoadError::MissingSlot { branch: 0, addr: 8 }));
    assert!(err.to_string().contains("as it should be"));
}

#[test]
fn delay_slot_past_code_end_is_a_load_error() {
    let process = process_at(0, &[NOP, cfl_i(0, true, 1), NOP]);
    let call = process.find_inst_at(4).unwrap().unwrap();
    assert!(matches!(
        process.delay_slots(&call),
        Err(LoadError::MissingSlot { branch: 4, addr: 0xc })
    ));
}

#[test]
fn delay_slots_do_not_wrap_past_the_address_space() {
    let process = process_at(0xffff_fff8, &[cfl_i(1, true, 4), NOP]);
    let br = process.find_inst_at(0xffff_fff8).unwrap().unwrap();
    assert!(matches!(
        process.delay_slots(&br),
        Err(LoadError::MissingSlot { branch: 0xffff_fff8, addr: 0 })
    ));
}

#[test]
fn truncated_long_immediate_is_a_memory_error() {
    let process = process_at(0, &[alu_l(0, 1, 2)]);
    assert!(matches!(process.find_inst_at(0), Err(LoadError::Memory { addr: 0, .. })));
}

#[test]
fn unknown_instruction_is_inert() {
    let process = process_at(0, &[UNKNOWN]);
    let inst = process.find_inst_at(0).unwrap().unwrap();
    assert!(inst.is_unknown());
    assert_eq!(inst.op(), Op::Unknown);
    assert_eq!(inst.size(), 0);
    assert_eq!(inst.kind(), Kind::empty());
    assert!(inst.read_regs().is_empty());
    assert!(inst.written_regs().is_empty());
    assert!(inst.semantics().is_empty());
    assert_eq!(process.delay_slots(&inst).unwrap(), 0);
    assert_eq!(inst.to_string(), "00000000  unknown");
}

#[test]
fn facts_are_identical_across_decodes() {
    let words = [guarded(ldt(0, 0, 1, 2, 3), true, 1), cfl_i(1, true, 0x3f_ffff), NOP, NOP];
    let a = process_at(0x40, &words);
    let b = process_at(0x40, &words);
    for addr in [0x40, 0x44] {
        let x = a.find_inst_at(addr).unwrap().unwrap();
        let y = b.find_inst_at(addr).unwrap().unwrap();
        let fresh = a.decode(addr).unwrap();
        assert_eq!(x.kind(), y.kind());
        assert_eq!(x.size(), fresh.size());
        assert_eq!(x.read_regs(), y.read_regs());
        assert_eq!(x.written_regs(), fresh.written_regs());
        assert_eq!(x.semantics(), fresh.semantics());
        assert!(std::ptr::eq(x.semantics(), x.semantics()));
    }
}

#[test]
fn lookups_outside_code_find_nothing() {
    let mut img = Image::from_words(0x100, &[NOP]);
    img.add_segment(Segment { name: ".data".into(), base: 0x200, bytes: vec![0; 8], exec: false });
    let process = Process::new(img, ProcessConfig::default());
    assert!(process.find_inst_at(0x200).unwrap().is_none());
    assert!(process.find_inst_at(0x0).unwrap().is_none());
    assert!(process.find_inst_at(0x100).unwrap().is_some());
}

#[test]
fn start_uses_configured_entry() {
    let words = [NOP, alu_r(0, 1, 2, 3)];
    assert_eq!(process_at(0x10, &words).start().unwrap().unwrap().address(), 0x10);
    let config: ProcessConfig = serde_json::from_str(r#"{ "entry": 20 }"#).unwrap();
    assert!(config.check_targets);
    let process = Process::new(Image::from_words(0x10, &words), config);
    assert_eq!(process.start().unwrap().unwrap().op(), Op::Add);
}

#[test]
fn features_and_source_lines() {
    let process = process_at(0, &[NOP, NOP]);
    assert!(process.provides(Features::CONTROL_DECODING | Features::REGISTER_USAGE | Features::DELAYED));
    assert!(process.source_line(0).is_none());
    assert!(process.addresses("main.c", 1).is_empty());
    assert!(matches!(
        process.require(Features::SOURCE_LINE | Features::INFO),
        Err(LoadError::Unsupported(f)) if f == Features::SOURCE_LINE
    ));

    let lines = LineMap::new(vec![LineEntry { file: "src/main.c".into(), line: 3, low: 0, high: 8 }]);
    let process = process.with_line_map(lines);
    assert!(process.require(Features::SOURCE_LINE).is_ok());
    assert_eq!(process.source_line(4), Some(("src/main.c", 3)));
    assert_eq!(process.addresses("main.c", 3), vec![(0, 8)]);
}

#[test]
fn concurrent_first_reads_agree() {
    let mut words = vec![NOP; 16];
    words[0] = cfl_i(1, true, 8);
    let process = process_at(0, &words);
    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    let br = process.find_inst_at(0).unwrap().unwrap();
                    let target = process.target(&br).unwrap().map(|t| t.address());
                    (Arc::as_ptr(&br) as usize, target, process.delay_slots(&br).unwrap(), br.semantics().len())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for r in &results {
        assert_eq!(r, &results[0]);
    }
    assert_eq!(results[0].1, Some(0x20));
    assert_eq!(results[0].2, 2);
}
