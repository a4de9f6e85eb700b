use pretty_assertions::assert_eq;
use rvpipe::asm::{AsmError, DataRecord};
use rvpipe::{assemble, DATA_BASE};

fn data_bytes(src: &str) -> Vec<u8> {
    assemble(src).unwrap().data.iter().map(|d| d.byte).collect()
}

#[test]
fn listing_format() {
    let src = "\
.data
val: .byte 1, 2
.text
main: addi x10, x0, 1   # set flag
      beq x10, x0, main
";
    let program = assemble(src).unwrap();
    let expected = "\
0x0 0x00100513 , addi x10, x0, 1 # 0010011-000-NULL-01010-00000-NULL-000000000001
0x4 0xFE050EE3 , beq x10, x0, main # 1100011-000-NULL-NULL-01010-00000-1111111111100
0x8 0x00000073 , end of file # exit

0x10000000 01
0x10000001 02
";
    assert_eq!(program.to_string(), expected);
    assert_eq!(program.halt_address, 8);
    assert_eq!(program.symbols["val"], DATA_BASE);
    assert_eq!(program.symbols["main"], 0);
}

#[test]
fn store_trace_puts_the_data_register_in_rs2() {
    let program = assemble("sw x10, 0(x6)").unwrap();
    assert_eq!(
        program.text[0].trace.to_string(),
        "0100011-010-NULL-NULL-00110-01010-000000000000"
    );
}

#[test]
fn r_type_trace_has_funct7_and_no_immediate() {
    let program = assemble("sub x3, x1, x2").unwrap();
    assert_eq!(
        program.text[0].trace.to_string(),
        "0110011-000-0100000-00011-00001-00010-NULL"
    );
}

#[test]
fn label_only_lines_name_the_next_instruction() {
    let src = "\
start:
    addi x1, x0, 1

next:   # comment after a label
    addi x3, x0, 2
done:
";
    let program = assemble(src).unwrap();
    assert_eq!(program.symbols["start"], 0);
    assert_eq!(program.symbols["next"], 4);
    assert_eq!(program.symbols["done"], 8);
    assert_eq!(program.halt_address, 8);
    assert_eq!(program.text[1].line, 5);
}

#[test]
fn data_directives_are_big_endian() {
    assert_eq!(data_bytes(".data\n.half 0x1234\n.word -2"), vec![0x12, 0x34, 0xFF, 0xFF, 0xFF, 0xFE]);
    assert_eq!(data_bytes(".data\n.halfword 1\n.double 2"), vec![0, 1, 0, 0, 0, 0, 0, 0, 0, 2]);
    assert_eq!(data_bytes(".data\n.byte 'a', 0b11, 0xff"), vec![0x61, 0x03, 0xFF]);
    assert_eq!(data_bytes(".data\n.asciz \"a#b\\n\" # tail"), vec![b'a', b'#', b'b', b'\n']);
}

#[test]
fn data_is_laid_out_contiguously() {
    let src = "\
.data
first: .byte 7
second: .word 0x01020304
.text
addi x1, x0, 1
.data
third:
.half 9
";
    let program = assemble(src).unwrap();
    assert_eq!(program.symbols["first"], DATA_BASE);
    assert_eq!(program.symbols["second"], DATA_BASE + 1);
    assert_eq!(program.symbols["third"], DATA_BASE + 5);
    assert_eq!(
        program.data[1..5].to_vec(),
        vec![
            DataRecord { address: DATA_BASE + 1, byte: 1 },
            DataRecord { address: DATA_BASE + 2, byte: 2 },
            DataRecord { address: DATA_BASE + 3, byte: 3 },
            DataRecord { address: DATA_BASE + 4, byte: 4 },
        ]
    );
    assert_eq!(program.text.len(), 1);
}

#[test]
fn errors_carry_line_numbers() {
    let err = assemble("a: addi x1, x0, 1\nb: addi x1, x0, 1\na: addi x1, x0, 1").unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert_eq!(err.kind(), &AsmError::DuplicateLabel("a".into()));
    assert_eq!(err.to_string(), "line 3: duplicate label `a`");

    let err = assemble("addi x1, x0, 1\n\nfoo x1").unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert_eq!(err.kind(), &AsmError::UnknownMnemonic("foo".into()));

    let err = assemble(".data\n.byte 1\n.byte 300").unwrap_err();
    assert_eq!(err.line(), Some(3));
    assert!(matches!(err.kind(), AsmError::ValueOutOfRange { .. }));
}

#[test]
fn directives_and_instructions_stay_in_their_segment() {
    assert_eq!(
        assemble(".word 5").unwrap_err().kind(),
        &AsmError::UnknownMnemonic(".word".into())
    );
    assert_eq!(
        assemble(".data\naddi x1, x0, 1").unwrap_err().kind(),
        &AsmError::UnknownMnemonic("addi".into())
    );
}

#[test]
fn bad_labels_and_strings() {
    assert!(matches!(
        assemble("1abc: addi x1, x0, 1").unwrap_err().kind(),
        AsmError::InvalidLabel(_)
    ));
    assert_eq!(
        assemble(".data\n.asciz \"\\x\"").unwrap_err().kind(),
        &AsmError::InvalidEscapeSequence('x')
    );
}

#[test]
fn data_labels_can_be_used_as_branch_operands() {
    // the offset from 0 to the data base does not fit 13 bits
    let err = assemble(".data\nbuf: .word 0\n.text\nbeq x0, x0, buf").unwrap_err();
    assert!(matches!(err.kind(), AsmError::ValueOutOfRange { .. }));
}
