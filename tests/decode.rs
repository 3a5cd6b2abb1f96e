mod common;

use common::*;
use patmos_rs::decoder::{Area, Format, Pred, UsedRegs};
use patmos_rs::isa::patmos::{self, PatmosDecoder};
use patmos_rs::{Decoder, Image, Kind, Op};
use pretty_assertions::assert_eq;

fn dec(w: u32) -> patmos_rs::Decoded {
    PatmosDecoder.decode_words(0x1000, w, None)
}

#[test]
fn add_register_form() {
    let d = dec(alu_r(0, 3, 1, 2));
    assert_eq!((d.op, d.format), (Op::Add, Format::AluR));
    assert_eq!((d.rd, d.rs1, d.rs2), (3, 1, 2));
    assert_eq!(d.size(), 4);
    assert!(d.guard.is_always());
    assert_eq!(patmos::kind(&d), Kind::IS_INT | Kind::IS_ALU);
}

#[test]
fn immediate_alu_is_zero_extended() {
    let d = dec(alu_i(7, 4, 5, 0xfff));
    assert_eq!((d.op, d.format, d.imm), (Op::And, Format::AluI, 0xfff));
}

#[test]
fn long_alu_fetches_second_word() {
    let img = Image::from_words(0, &[alu_l(11, 1, 2), 0xdead_beef]);
    let d = PatmosDecoder.decode(&img, 0).unwrap();
    assert_eq!((d.op, d.format), (Op::Shadd, Format::AluL));
    assert_eq!(d.imm, 0xdead_beef);
    assert_eq!(d.size(), 8);
    assert!(d.bundle);
}

#[test]
fn long_alu_needs_bundle_bit_and_valid_func() {
    assert!(dec(alu_l(0, 1, 2) & !BUNDLE).is_unknown());
    let img = Image::from_words(0, &[alu_l(8, 1, 2), 0]);
    assert!(PatmosDecoder.decode(&img, 0).unwrap().is_unknown());
}

#[test]
fn long_alu_at_image_end_fails_to_fetch() {
    let img = Image::from_words(0, &[alu_l(0, 1, 2)]);
    assert!(PatmosDecoder.decode(&img, 0).is_err());
}

#[test]
fn unknown_opcode_is_inert() {
    let d = dec(UNKNOWN);
    assert_eq!(d.op, Op::Unknown);
    assert_eq!(d.size(), 0);
    assert_eq!(patmos::kind(&d), Kind::empty());
    assert_eq!(patmos::used_regs(&d), UsedRegs::default());
    assert!(dec(alu_r(13, 1, 2, 3)).is_unknown());
    assert!(dec(alu_u(3, 1, 2)).is_unknown());
}

#[test]
fn decoding_is_idempotent() {
    for w in [alu_r(0, 3, 1, 2), ldt(0, 3, 1, 2, 5), cfl_i(1, true, 0x3f_fff0), UNKNOWN] {
        assert_eq!(dec(w), dec(w));
    }
}

#[test]
fn guard_and_predicates() {
    let d = dec(guarded(alu_c(2, 3, 1, 2), true, 5));
    assert_eq!(d.guard, Pred { neg: true, idx: 5 });
    assert_eq!((d.op, d.pd), (Op::Cmplt, 3));
    assert!(patmos::kind(&d).contains(Kind::IS_COND));

    let d = dec(alu_p(7, 1, 0b1010, 0b0011));
    assert_eq!(d.op, Op::Pand);
    assert_eq!(d.ps1, Pred { neg: true, idx: 2 });
    assert_eq!(d.ps2, Pred { neg: false, idx: 3 });

    let d = dec(alu_ci(6, 2, 4, 17));
    assert_eq!((d.op, d.format, d.imm), (Op::Btest, Format::AluCi, 17));
}

#[test]
fn typed_memory_accesses() {
    let d = dec(ldt(4, 0, 1, 2, 3));
    assert_eq!((d.op, d.area, d.imm), (Op::Lbu, Area::Stack, 3));
    assert_eq!(patmos::kind(&d), Kind::IS_MEM | Kind::IS_LOAD);

    assert_eq!(dec(ldt(5, 3, 0, 2, 0)).op, Op::Dlw);
    assert!(dec(ldt(5, 1, 0, 2, 0)).is_unknown());

    let d = dec(stt(1, 1, 4, 5, 6));
    assert_eq!((d.op, d.area, d.rs1, d.rs2, d.imm), (Op::Sh, Area::Local, 4, 5, 6));
    assert_eq!(patmos::kind(&d), Kind::IS_MEM | Kind::IS_STORE);
    assert!(dec(stt(3, 0, 1, 2, 0)).is_unknown());
}

#[test]
fn stack_control() {
    assert_eq!((dec(stc_i(0, 9)).op, dec(stc_i(0, 9)).imm), (Op::Sres, 9));
    assert_eq!(dec(stc_r(3, 4)).format, Format::StcR);
    assert!(dec(stc_r(0, 4)).is_unknown());
}

#[test]
fn control_kinds() {
    assert_eq!(patmos::kind(&dec(cfl_i(0, true, 0x100))), Kind::IS_CONTROL | Kind::IS_CALL);
    assert_eq!(patmos::kind(&dec(cfl_i(3, false, 2))), Kind::IS_CONTROL | Kind::IS_TRAP);
    assert_eq!(patmos::kind(&dec(cfl_r(0, 1, true, 0, 0))), Kind::IS_CONTROL | Kind::IS_RETURN);
    assert_eq!(
        patmos::kind(&dec(cfl_r(1, 0, true, 3, 0))),
        Kind::IS_CONTROL | Kind::IS_CALL | Kind::IS_INDIRECT
    );
    assert_eq!(dec(cfl_r(2, 0, false, 3, 4)).op, Op::Brcf);
    assert!(dec(cfl_r(2, 1, false, 3, 4)).is_unknown());
}

#[test]
fn branch_targets() {
    // pc-relative, forward and backward
    assert_eq!(patmos::target(&dec(cfl_i(1, false, 0x10))), Some(0x1040));
    assert_eq!(patmos::target(&dec(cfl_i(1, false, 0x3f_fffc))), Some(0x0ff0));
    // absolute, in words
    assert_eq!(patmos::target(&dec(cfl_i(0, true, 0x100))), Some(0x400));
    assert_eq!(patmos::target(&dec(cfl_i(2, true, 0x20))), Some(0x80));
    // zero and indirect are unknown
    assert_eq!(patmos::target(&dec(cfl_i(0, true, 0))), None);
    assert_eq!(patmos::target(&dec(cfl_r(1, 1, true, 3, 0))), None);
    assert_eq!(patmos::target(&dec(cfl_r(0, 0, true, 0, 0))), None);
}

#[test]
fn delay_depths() {
    assert_eq!(patmos::delayed(&dec(cfl_i(0, true, 1))), 3);
    assert_eq!(patmos::delayed(&dec(cfl_i(1, true, 1))), 2);
    assert_eq!(patmos::delayed(&dec(cfl_i(1, false, 1))), 0);
    assert_eq!(patmos::delayed(&dec(cfl_i(3, true, 1))), 0);
    assert_eq!(patmos::delayed(&dec(cfl_r(0, 0, true, 0, 0))), 3);
    assert_eq!(patmos::delayed(&dec(alu_r(0, 1, 2, 3))), 0);
}

#[test]
fn special_moves() {
    let d = dec(mts(6, 3));
    assert_eq!((d.op, d.sreg, d.rs1), (Op::Mts, 6, 3));
    let d = dec(mfs(4, 0));
    assert_eq!((d.op, d.sreg, d.rd), (Op::Mfs, 0, 4));
    assert_eq!(dec(wait_mem()).op, Op::WaitMem);
}
