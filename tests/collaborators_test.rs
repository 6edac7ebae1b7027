use multistream::form::{url_encode, FormEncoding, FormError, FormWriter, OCTET_STREAM};
use multistream::integrity::{digest_hex, IntegrityAlgorithm};
use multistream::varint::{BinaryReadExt, BinaryWriteExt};
use multistream::{ContainerReader, ContainerWriter, ItemFlags};
use std::io::{self, Cursor};

// ── varint ───────────────────────────────────────────────────────────────────

#[test]
fn test_smart_int_layout() {
    let cases: &[(i32, &[u8])] = &[
        (0, &[0x00]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (300, &[0xAC, 0x02]),
        (i32::MAX, &[0xFF, 0xFF, 0xFF, 0xFF, 0x07]),
        (-1, &[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
    ];
    for (value, expected) in cases {
        let mut buf = Vec::new();
        let n = buf.write_smart_int(*value).unwrap();
        assert_eq!(n, expected.len(), "length for {value}");
        assert_eq!(&buf, expected, "bytes for {value}");
        assert_eq!((&buf[..]).read_smart_int().unwrap(), *value);
    }
}

#[test]
fn test_smart_int_overflow_rejected() {
    let err = (&[0xFFu8, 0xFF, 0xFF, 0xFF, 0x1F][..]).read_smart_int().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
}

#[test]
fn test_byte_array_prefix() {
    let mut buf = Vec::new();
    assert_eq!(buf.write_byte_array(b"abc").unwrap(), 4);
    assert_eq!(buf, b"\x03abc");

    let mut cursor = &buf[..];
    assert_eq!(cursor.read_byte_array().unwrap(), b"abc");

    let err = (&b"\x05ab"[..]).read_byte_array().unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
}

// ── hex ──────────────────────────────────────────────────────────────────────

#[test]
fn test_digest_hex_is_lowercase() {
    assert_eq!(digest_hex(&[0xDE, 0xAD, 0xBE, 0xEF, 0x01]), "deadbeef01");
    let d = IntegrityAlgorithm::Blake3.digest(b"");
    assert_eq!(digest_hex(&d), blake3::hash(b"").to_hex().to_string());
}

// ── form ─────────────────────────────────────────────────────────────────────

#[test]
fn test_url_encoded_body() {
    let mut form = FormWriter::new(Vec::new(), FormEncoding::UrlEncoded);
    assert_eq!(form.content_type(), "application/x-www-form-urlencoded");
    form.add_value("name", "John Doe").unwrap();
    form.add_value("q", "a&b=c/ü").unwrap();
    let body = form.finish().unwrap();
    assert_eq!(String::from_utf8(body).unwrap(), "name=John+Doe&q=a%26b%3Dc%2F%C3%BC");
}

#[test]
fn test_multipart_body() {
    let mut form = FormWriter::with_boundary(Vec::new(), FormEncoding::Multipart, "XYZ");
    assert_eq!(form.content_type(), "multipart/form-data; boundary=XYZ");
    form.add_value("field", "value").unwrap();
    let copied = form
        .add_file("upload", "/tmp/dir/data.bin", &mut &b"\x00\x01"[..], OCTET_STREAM)
        .unwrap();
    assert_eq!(copied, 2);
    let body = form.finish().unwrap();

    let expected: &[u8] = b"--XYZ\r\n\
        Content-Disposition: form-data; name=\"field\"\r\n\r\n\
        value\r\n\
        --XYZ\r\n\
        Content-Disposition: form-data; name=\"upload\"; filename=\"data.bin\"\r\n\
        Content-Type: application/octet-stream\r\n\r\n\
        \x00\x01\r\n\
        --XYZ--\r\n";
    assert_eq!(body, expected);
}

#[test]
fn test_form_rejects_invalid_use() {
    let mut url = FormWriter::new(Vec::new(), FormEncoding::UrlEncoded);
    assert!(matches!(url.add_bytes("k", b"v"), Err(FormError::Unsupported { op: "add_bytes", .. })));
    assert!(matches!(url.add_value("", "v"), Err(FormError::EmptyKey)));
    assert!(matches!(url.add_value("k", ""), Err(FormError::EmptyValue(_))));

    let mut multi = FormWriter::new(Vec::new(), FormEncoding::Multipart);
    assert_eq!(multi.boundary().len(), 32);
    assert!(matches!(multi.add_bytes("bad key", b"v"), Err(FormError::UnsafeKey(_))));
}

#[test]
fn test_url_encode_passes_alphanumerics() {
    assert_eq!(url_encode("abcXYZ019"), "abcXYZ019");
    assert_eq!(url_encode("a b"), "a+b");
    assert_eq!(url_encode("~"), "%7E");
}

#[test]
fn test_container_as_multipart_upload() {
    let mut writer = ContainerWriter::new(Cursor::new(Vec::new())).unwrap();
    writer.append(1, ItemFlags::GZIPPED, b"uploaded payload").unwrap();
    writer.finalize().unwrap();
    let container = writer.into_inner().into_inner();

    let mut form = FormWriter::with_boundary(Vec::new(), FormEncoding::Multipart, "b0");
    form.add_value("name", "nightly").unwrap();
    form.add_file("container", "nightly.mst", &mut &container[..], OCTET_STREAM).unwrap();
    let body = form.finish().unwrap();

    // the container bytes appear verbatim in the body and still open
    let start = body.windows(4).position(|w| w == b"MSTR").unwrap();
    let embedded = body[start..start + container.len()].to_vec();
    assert_eq!(embedded, container);
    let mut reader = ContainerReader::open(Cursor::new(embedded)).unwrap();
    assert_eq!(reader.read_item(0).unwrap(), b"uploaded payload");
}
