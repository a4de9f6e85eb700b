use pretty_assertions::assert_eq;
use rvpipe::bits::sign_extend;
use rvpipe::decoder::Decoder;
use rvpipe::disasm::fmt_decoded;
use rvpipe::instructions::Format;
use rvpipe::isa::rv32::Rv32Decoder;
use rvpipe::assemble;

const LINES: &[&str] = &[
    "add x3, x1, x2",
    "sub x31, x30, x29",
    "mul x5, x6, x7",
    "div x5, x6, x7",
    "rem x5, x6, x7",
    "and x1, x2, x3",
    "or x1, x2, x3",
    "xor x1, x2, x3",
    "sll x1, x2, x3",
    "srl x1, x2, x3",
    "sra x1, x2, x3",
    "slt x1, x2, x3",
    "addi x1, x0, -1",
    "andi x4, x5, 2047",
    "ori x6, x6, 256",
    "xori x6, x6, -2048",
    "slti x6, x6, 5",
    "slli x1, x1, 31",
    "srli x1, x1, 1",
    "srai x1, x1, 3",
    "lb x9, -4(x5)",
    "lh x9, 2(x5)",
    "lw x9, 0(x5)",
    "jalr x0, x1, 0",
    "sb x10, 5(x6)",
    "sh x10, -6(x6)",
    "sw x10, 2047(x6)",
    "beq x0, x0, -8",
    "bne x1, x2, 4094",
    "blt x1, x2, -4096",
    "bge x1, x2, 16",
    "lui x5, 0x10000",
    "auipc x5, 0x1",
    "jal x1, 12",
    "jal x0, -1048576",
];

#[test]
fn disassembly_reassembles_to_the_same_word() {
    let dec = Rv32Decoder::new();
    for line in LINES {
        let word = assemble(line).unwrap().text[0].word;
        let text = fmt_decoded(&dec.decode(word).unwrap());
        assert_eq!(&text, line);
        assert_eq!(assemble(&text).unwrap().text[0].word, word, "{line}");
    }
}

#[test]
fn decoded_fields_match_the_trace() {
    let dec = Rv32Decoder::new();
    for line in LINES {
        let record = &assemble(line).unwrap().text[0];
        let d = dec.decode(record.word).unwrap();
        let t = record.trace;

        assert_eq!(d.opcode, t.opcode, "{line}");
        assert_eq!(d.funct3, t.funct3, "{line}");
        assert_eq!((d.rd, d.rs1, d.rs2), (t.rd, t.rs1, t.rs2), "{line}");
        if d.format == Format::R {
            assert_eq!(d.funct7, t.funct7, "{line}");
        }
        if let Some(imm) = t.imm {
            let expected = match d.format {
                Format::U => (imm.bits << 12) as i32,
                Format::I if d.op.is_shift_imm() => (imm.bits & 0x1F) as i32,
                _ => sign_extend(imm.bits, imm.width),
            };
            assert_eq!(d.imm, expected, "{line}");
        }
    }
}
