use std::rc::Rc;

use pretty_assertions::assert_eq;

use crate::constant::PgType;
use crate::cursor::RowCursor;
use crate::error::Error;
use crate::opts::{AccessMode, Opts};
use crate::protocol::{ColumnDescription, DataRow, write_data_row};
use crate::value::Value;

fn opts(mode: AccessMode) -> Opts {
    Opts {
        access_mode: mode,
        buffer_size: 4,
    }
}

fn row(values: &[Option<&[u8]>]) -> DataRow {
    let mut payload = Vec::new();
    write_data_row(&mut payload, values).unwrap();
    DataRow::parse(payload).unwrap()
}

fn text_cursor(mode: AccessMode, values: &[Option<&str>]) -> RowCursor {
    let columns = (0..values.len())
        .map(|i| ColumnDescription::new(format!("c{i}"), PgType::Text))
        .collect();
    let mut cursor = RowCursor::new(columns, opts(mode));
    let raw: Vec<Option<&[u8]>> = values.iter().map(|v| v.map(str::as_bytes)).collect();
    cursor.advance_row(row(&raw)).unwrap();
    cursor
}

#[test]
fn test_no_row_loaded() {
    let mut cursor = RowCursor::new(
        vec![ColumnDescription::new("a", PgType::Text)],
        Opts::default(),
    );
    assert!(matches!(cursor.get_string(0), Err(Error::InvalidState(_))));
    assert!(matches!(cursor.is_null(0), Err(Error::InvalidState(_))));
}

#[test]
fn test_column_count_mismatch() {
    let mut cursor = RowCursor::new(
        vec![ColumnDescription::new("a", PgType::Text)],
        Opts::default(),
    );
    let err = cursor
        .advance_row(row(&[Some(b"x".as_slice()), None]))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidPacket));
}

#[test]
fn test_sequential_column_order() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("a"), Some("b"), Some("c")]);
    assert_eq!(cursor.get_string(1).unwrap(), "b");
    assert_eq!(cursor.current_column(), Some(1));
    assert!(matches!(cursor.get_string(0), Err(Error::InvalidState(_))));
    assert_eq!(cursor.get_string(2).unwrap(), "c");
}

#[test]
fn test_advance_column() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("a"), Some("b"), Some("c")]);
    let mut reader = cursor.get_text_reader(0).unwrap();
    cursor.advance_column(2).unwrap();
    assert_eq!(cursor.current_column(), Some(2));
    assert!(reader.next().is_some_and(|r| r.is_err()));
    assert!(matches!(cursor.advance_column(1), Err(Error::InvalidState(_))));
    assert!(matches!(cursor.advance_column(3), Err(Error::OutOfRange(_))));
    assert_eq!(cursor.get_string(2).unwrap(), "c");
}

#[test]
fn test_buffered_any_order() {
    let mut cursor = text_cursor(AccessMode::Buffered, &[Some("a"), Some("b")]);
    assert_eq!(cursor.get_string(1).unwrap(), "b");
    assert_eq!(cursor.get_string(0).unwrap(), "a");
    assert_eq!(cursor.get_string(1).unwrap(), "b");
}

#[test]
fn test_null_column() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[None, Some("x")]);
    assert!(cursor.is_null(0).unwrap());
    assert!(!cursor.is_null(1).unwrap());
    assert!(matches!(cursor.get_string(0), Err(Error::InvalidCast(_))));
    assert!(matches!(cursor.get_text_reader(0), Err(Error::InvalidCast(_))));
    assert!(matches!(
        cursor.get_chars(0, 0, None, 0, 0),
        Err(Error::InvalidCast(_))
    ));
    // A failed call does not advance the cursor
    assert_eq!(cursor.current_column(), None);
    assert_eq!(cursor.get_value(0).unwrap(), Value::Null);
}

#[test]
fn test_out_of_range_column() {
    let mut cursor = text_cursor(AccessMode::Buffered, &[Some("x")]);
    assert!(matches!(cursor.get_string(3), Err(Error::OutOfRange(_))));
    assert!(matches!(cursor.is_null(3), Err(Error::OutOfRange(_))));
}

#[test]
fn test_get_chars_buffer_check_precedes_advance() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("abc"), Some("def")]);
    let mut buf = ['\0'; 2];
    assert!(matches!(
        cursor.get_chars(1, 0, Some(&mut buf[..]), 0, 3),
        Err(Error::BufferTooSmall { .. })
    ));
    assert_eq!(cursor.current_column(), None);
    assert_eq!(cursor.get_string(0).unwrap(), "abc");
}

#[test]
fn test_sequential_reader_disposed_on_column_change() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("hello"), Some("world")]);
    let mut reader = cursor.get_text_reader(0).unwrap();
    let mut buf = ['\0'; 2];
    assert_eq!(reader.read(&mut buf, 0, 2).unwrap(), 2);

    assert_eq!(cursor.get_string(1).unwrap(), "world");
    assert!(matches!(reader.read(&mut buf, 0, 1), Err(Error::Disposed(_))));
    assert!(matches!(reader.peek(), Err(Error::Disposed(_))));
}

#[test]
fn test_sequential_second_reader() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("hello")]);
    let mut first = cursor.get_text_reader(0).unwrap();
    assert!(matches!(
        cursor.get_text_reader(0),
        Err(Error::InvalidState(_))
    ));
    assert_eq!(first.next().unwrap().unwrap(), 'h');

    // Once closed, a new reader continues where the first one stopped
    first.close();
    let mut second = cursor.get_text_reader(0).unwrap();
    assert_eq!(second.read_to_string().unwrap(), "ello");
}

#[test]
fn test_sequential_reader_shares_position() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("ABCDE")]);
    let mut reader = cursor.get_text_reader(0).unwrap();
    let mut buf = ['\0'; 2];
    reader.read(&mut buf, 0, 2).unwrap();
    assert!(matches!(
        cursor.get_chars(0, 0, Some(&mut buf[..]), 0, 1),
        Err(Error::InvalidState(_))
    ));
    assert_eq!(cursor.get_chars(0, 2, Some(&mut buf[..]), 0, 2).unwrap(), 2);
    assert_eq!(buf, ['C', 'D']);
    assert_eq!(reader.read_to_string().unwrap(), "E");
}

#[test]
fn test_buffered_readers_are_independent() {
    let mut cursor = text_cursor(AccessMode::Buffered, &[Some("h\u{e9}llo")]);
    let mut first = cursor.get_text_reader(0).unwrap();
    let mut second = cursor.get_text_reader(0).unwrap();
    assert_eq!(first.next().unwrap().unwrap(), 'h');
    assert_eq!(second.read_to_string().unwrap(), "h\u{e9}llo");
    assert_eq!(first.read_to_string().unwrap(), "\u{e9}llo");
    // Readers do not move the column itself
    assert_eq!(cursor.get_string(0).unwrap(), "h\u{e9}llo");
}

#[test]
fn test_row_change_disposes_readers_in_both_modes() {
    for mode in [AccessMode::Buffered, AccessMode::Sequential] {
        let mut cursor = text_cursor(mode, &[Some("abc"), Some("def")]);
        let mut reader = cursor.get_text_reader(1).unwrap();
        cursor
            .advance_row(row(&[Some(b"x".as_slice()), Some(b"y".as_slice())]))
            .unwrap();
        assert!(matches!(reader.next(), Some(Err(Error::Disposed(_)))));
        assert_eq!(cursor.get_string(0).unwrap(), "x");
    }
}

#[test]
fn test_disposed_reader_releases_row_buffer() {
    for mode in [AccessMode::Buffered, AccessMode::Sequential] {
        let columns = vec![ColumnDescription::new("a", PgType::Text)];
        let mut cursor = RowCursor::new(columns, opts(mode));
        let first = row(&[Some("abcdef".as_bytes())]);
        let buffer = Rc::downgrade(first.buffer());
        cursor.advance_row(first).unwrap();

        let mut reader = cursor.get_text_reader(0).unwrap();
        assert_eq!(reader.next().unwrap().unwrap(), 'a');
        cursor.advance_row(row(&[Some(b"x".as_slice())])).unwrap();
        assert!(buffer.upgrade().is_none());
        assert!(reader.is_closed());

        let second = row(&[Some(b"yz".as_slice())]);
        let buffer = Rc::downgrade(second.buffer());
        cursor.advance_row(second).unwrap();
        let mut reader = cursor.get_text_reader(0).unwrap();
        reader.close();
        cursor.close();
        assert!(buffer.upgrade().is_none());
        assert!(matches!(reader.peek(), Err(Error::Disposed(_))));
    }
}

#[test]
fn test_closed_reader_checked_before_buffer() {
    let mut cursor = text_cursor(AccessMode::Sequential, &[Some("abc")]);
    let mut reader = cursor.get_text_reader(0).unwrap();
    reader.close();
    assert!(matches!(reader.read(&mut [], 0, 1), Err(Error::Disposed(_))));
    assert!(matches!(
        reader.read(&mut ['\0'; 2], 1, 5),
        Err(Error::Disposed(_))
    ));
}

#[test]
fn test_close_and_abort() {
    let mut cursor = text_cursor(AccessMode::Buffered, &[Some("abc")]);
    let mut reader = cursor.get_text_reader(0).unwrap();
    cursor.abort();
    assert!(cursor.is_closed());
    assert!(matches!(reader.read_to_string(), Err(Error::Disposed(_))));
    assert!(matches!(cursor.get_string(0), Err(Error::Disposed(_))));
    assert!(matches!(
        cursor.advance_row(row(&[Some(b"x".as_slice())])),
        Err(Error::Disposed(_))
    ));
}

#[test]
fn test_typed_accessors() {
    let columns = vec![
        ColumnDescription::new("c", PgType::Char),
        ColumnDescription::new("i", PgType::Int4),
        ColumnDescription::new("b", PgType::Bool),
        ColumnDescription::new("t", PgType::Varchar),
        ColumnDescription::new("l", PgType::Int8),
    ];
    let mut cursor = RowCursor::new(columns, opts(AccessMode::Buffered));
    cursor
        .advance_row(row(&[
            Some([253u8].as_slice()),
            Some(b"-42".as_slice()),
            Some(b"t".as_slice()),
            Some(b"abc".as_slice()),
            Some(b"9000000000".as_slice()),
        ]))
        .unwrap();

    assert_eq!(cursor.get_char(0).unwrap(), '\u{fd}');
    assert_eq!(cursor.get_i32(1).unwrap(), -42);
    assert!(matches!(cursor.get_i32(3), Err(Error::InvalidCast(_))));
    assert!(matches!(cursor.get_string(1), Err(Error::InvalidCast(_))));
    assert!(matches!(cursor.get_char(3), Err(Error::InvalidCast(_))));

    assert_eq!(cursor.get_value(0).unwrap(), Value::Char('\u{fd}'));
    assert_eq!(cursor.get_value(1).unwrap(), Value::Int(-42));
    assert_eq!(cursor.get_value(2).unwrap(), Value::Bool(true));
    assert_eq!(cursor.get_value(3).unwrap(), Value::Text("abc".to_string()));
    assert_eq!(cursor.get_value(4).unwrap(), Value::Int(9_000_000_000));
}

#[test]
fn test_unknown_type_is_bytes() {
    let columns = vec![ColumnDescription::with_oid("blob", 17)];
    let mut cursor = RowCursor::new(columns, opts(AccessMode::Sequential));
    cursor
        .advance_row(row(&[Some([0u8, 1, 255].as_slice())]))
        .unwrap();
    assert!(matches!(cursor.get_string(0), Err(Error::InvalidCast(_))));
    assert_eq!(cursor.get_value(0).unwrap(), Value::Bytes(vec![0, 1, 255]));
    assert!(matches!(cursor.get_value(0), Err(Error::InvalidState(_))));
}
