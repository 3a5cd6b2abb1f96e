use crate::decoder::{Decoded, Format, Op, Pred};
use crate::instructions::desc;
use crate::isa::patmos::{raw_target, sign_ext};

/// Assembly text of one instruction, guard included.
pub fn fmt_decoded(d: &Decoded) -> String {
    if d.is_unknown() {
        return "unknown".to_string();
    }
    let body = body(d);
    if d.guard.is_always() {
        body
    } else {
        format!("({}) {}", pred(d.guard), body)
    }
}

fn pred(p: Pred) -> String {
    if p.neg { format!("!p{}", p.idx) } else { format!("p{}", p.idx) }
}

fn body(d: &Decoded) -> String {
    let mn = desc(d.op).mnemonic;
    match d.format {
        Format::AluR => format!("{} r{} = r{}, r{}", mn, d.rd, d.rs1, d.rs2),
        Format::AluI => format!("{}i r{} = r{}, {}", mn, d.rd, d.rs1, d.imm),
        Format::AluL => format!("{}l r{} = r{}, {:#x}", mn, d.rd, d.rs1, d.imm),
        Format::AluU => format!("{} r{} = r{}", mn, d.rd, d.rs1),
        Format::AluM => format!("{} r{}, r{}", mn, d.rs1, d.rs2),
        Format::AluC => format!("{} p{} = r{}, r{}", mn, d.pd, d.rs1, d.rs2),
        Format::AluCi => format!("{}i p{} = r{}, {}", mn, d.pd, d.rs1, d.imm),
        Format::AluP => format!("{} p{} = {}, {}", mn, d.pd, pred(d.ps1), pred(d.ps2)),
        Format::AluB => format!("{} r{} = r{}, {}, {}", mn, d.rd, d.rs1, d.imm, pred(d.ps1)),
        Format::SpcW => mn.to_string(),
        Format::SpcT => format!("{} s{} = r{}", mn, d.sreg, d.rs1),
        Format::SpcF => format!("{} r{} = s{}", mn, d.rd, d.sreg),
        Format::LdT => {
            let dst = if d.op == Op::Dlw { "sm".to_string() } else { format!("r{}", d.rd) };
            format!("{}{} {} = [r{} + {}]", mn, d.area.suffix(), dst, d.rs1, d.imm)
        }
        Format::StT => format!("{}{} [r{} + {}] = r{}", mn, d.area.suffix(), d.rs1, d.imm, d.rs2),
        Format::StcI => format!("{} {}", mn, d.imm),
        Format::StcR => format!("{} r{}", mn, d.rs1),
        Format::CflI => {
            let mn = delay_suffix(mn, d);
            match d.op {
                Op::Trap => format!("{} {}", mn, d.imm),
                Op::Br => format!(
                    "{} {:#x} <{:+}>",
                    mn,
                    raw_target(d).unwrap_or(0),
                    (sign_ext(d.imm, 22) as i32) << 2
                ),
                _ => format!("{} {:#x}", mn, d.imm << 2),
            }
        }
        Format::CflRs => format!("{} r{}", delay_suffix(&format!("{mn}r"), d), d.rs1),
        Format::CflRt => format!("{} r{}, r{}", delay_suffix(&format!("{mn}r"), d), d.rs1, d.rs2),
        Format::CflRi => delay_suffix(mn, d),
        Format::None => mn.to_string(),
    }
}

fn delay_suffix(mn: &str, d: &Decoded) -> String {
    if d.delayed || d.op == Op::Trap { mn.to_string() } else { format!("{mn}nd") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::Decoder;
    use crate::isa::patmos::PatmosDecoder;

    fn dis(w: u32) -> String {
        fmt_decoded(&PatmosDecoder.decode_words(0x1000, w, None))
    }

    #[test]
    fn formats_alu_and_guard() {
        assert_eq!(dis((0b01000 << 22) | (3 << 17) | (1 << 12) | (2 << 7)), "add r3 = r1, r2");
        assert_eq!(dis((0b1010 << 27) | (1 << 17) | (1 << 12) | 4), "(!p2) addi r1 = r1, 4");
    }

    #[test]
    fn formats_branches() {
        assert_eq!(dis(0x04c0_0010), "br 0x1040 <+64>");
        assert_eq!(dis(0x0480_0010), "brnd 0x1040 <+64>");
    }

    #[test]
    fn formats_unknown() {
        assert_eq!(dis(0x0740_0000), "unknown");
    }
}
