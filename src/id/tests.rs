use bytes::Bytes;

use super::{describe, length, IdBuilder, IdRecord, IdWalker};
use crate::error::LobError;

fn walker_for(builder: IdBuilder) -> IdWalker {
    IdWalker::new(builder.freeze())
}

#[test]
fn test_empty_id() {
    let mut walker = IdWalker::new(Bytes::new());
    assert_eq!(walker.next_record().unwrap(), None);
    assert_eq!(length(&[]).unwrap(), 0);
}

#[test]
fn test_builder_walker_roundtrip() {
    let mut builder = IdBuilder::new();
    builder.append_inline(b"abc");
    builder.append_block_ref(300, 7);
    builder.append_indirect(5000, 8);

    let mut walker = walker_for(builder);
    assert_eq!(
        walker.next_record().unwrap(),
        Some(IdRecord::Inline(Bytes::from_static(b"abc")))
    );
    assert_eq!(
        walker.next_record().unwrap(),
        Some(IdRecord::BlockRef { len: 300, key: 7 })
    );
    assert_eq!(
        walker.next_record().unwrap(),
        Some(IdRecord::Indirect {
            total_len: 5000,
            key: 8
        })
    );
    assert_eq!(walker.next_record().unwrap(), None);
    assert!(walker.is_finished());
}

#[test]
fn test_wire_format() {
    let mut builder = IdBuilder::new();
    builder.append_inline(b"ab");
    assert_eq!(builder.as_bytes(), &[0, 2, b'a', b'b']);

    let mut builder = IdBuilder::new();
    builder.append_block_ref(300, 5);
    assert_eq!(builder.as_bytes(), &[1, 0xac, 0x02, 5]);

    let mut builder = IdBuilder::new();
    builder.append_indirect(300, 200);
    assert_eq!(builder.as_bytes(), &[2, 0xac, 0x02, 0xc8, 0x01]);
}

#[test]
fn test_length_sums_declared_lengths() {
    let mut builder = IdBuilder::new();
    builder.append_inline(b"0123456789");
    builder.append_block_ref(1024, 0);
    builder.append_indirect(100_000, 1);
    assert_eq!(length(builder.as_bytes()).unwrap(), 10 + 1024 + 100_000);
}

#[test]
fn test_extend_from_concatenates() {
    let mut first = IdBuilder::new();
    first.append_inline(b"xy");
    let mut second = IdBuilder::new();
    second.append_block_ref(512, 3);
    first.extend_from(&second);

    assert_eq!(length(first.as_bytes()).unwrap(), 2 + 512);
    let mut walker = walker_for(first);
    assert!(matches!(
        walker.next_record().unwrap(),
        Some(IdRecord::Inline(_))
    ));
    assert!(matches!(
        walker.next_record().unwrap(),
        Some(IdRecord::BlockRef { len: 512, key: 3 })
    ));
}

#[test]
fn test_unknown_tag_fails() {
    let err = length(&[9u8]).unwrap_err();
    assert_eq!(
        err.downcast_ref::<LobError>(),
        Some(&LobError::MalformedId("unknown record tag"))
    );
}

#[test]
fn test_truncated_records_fail() {
    // inline record declaring more data than the id holds
    assert!(length(&[0, 5, b'a']).is_err());
    // block-ref cut off inside the key varlong
    assert!(length(&[1, 10, 0x80]).is_err());
    // bare tag with nothing behind it
    assert!(length(&[2]).is_err());
}

#[test]
fn test_splice_prepends_nested_id() {
    let mut outer = IdBuilder::new();
    outer.append_block_ref(100, 9);
    let mut walker = walker_for(outer);

    let mut nested = IdBuilder::new();
    nested.append_inline(b"zz");
    walker.splice(nested.freeze());

    assert!(matches!(
        walker.next_record().unwrap(),
        Some(IdRecord::Inline(_))
    ));
    assert!(matches!(
        walker.next_record().unwrap(),
        Some(IdRecord::BlockRef { len: 100, key: 9 })
    ));
    assert_eq!(walker.next_record().unwrap(), None);
}

#[test]
fn test_finish_drops_remaining_records() {
    let mut builder = IdBuilder::new();
    builder.append_block_ref(100, 1);
    builder.append_block_ref(100, 2);
    let mut walker = walker_for(builder);
    walker.next_record().unwrap();
    walker.finish();
    assert!(walker.is_finished());
    assert_eq!(walker.next_record().unwrap(), None);
}

#[test]
fn test_describe() {
    let mut builder = IdBuilder::new();
    builder.append_inline(b"abc");
    builder.append_block_ref(300, 7);
    builder.append_indirect(5000, 8);
    let text = describe(builder.as_bytes());
    assert!(text.contains("data len=3"));
    assert!(text.contains("block 7 len=300"));
    assert!(text.contains("indirect block 8 len=5000"));
    assert!(text.ends_with("length=5303"));
}

#[test]
fn test_describe_malformed() {
    assert_eq!(describe(&[9u8]), "error, length=0");
}
