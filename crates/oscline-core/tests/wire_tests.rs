//! Wire format tests
//!
//! These tests verify that:
//! 1. The writer produces the exact OSC 1.0 byte layout
//! 2. Every written element reads back through the typed readers
//! 3. Reader coercions follow the OSC type system
//! 4. Datagrams interoperate with a third-party OSC library (rosc)

use oscline_core::writer::padded_string_len;
use oscline_core::{
    is_bundle, tag_word, Color32, Error, MidiMessage, NtpTimestamp, OscParser, OscWriter,
    TypeTag, Vector2, Vector3,
};
use rosc::{decoder, encoder};
use rosc::{OscBundle, OscColor, OscMessage, OscMidiMessage, OscPacket, OscTime, OscType};

fn parse(bytes: &[u8]) -> OscParser {
    let mut parser = OscParser::new();
    parser.parse(bytes, 0).expect("datagram should parse");
    parser
}

#[test]
fn test_synth_freq_scenario_bytes() {
    let mut writer = OscWriter::new();
    writer
        .write_address_and_tags("/synth/1/freq", tag_word::FLOAT32)
        .unwrap();
    writer.write_float(440.0).unwrap();

    let bytes = writer.as_bytes();
    assert_eq!(&bytes[..16], b"/synth/1/freq\0\0\0");
    assert_eq!(&bytes[16..20], b",f\0\0");
    assert_eq!(&bytes[20..], &[0x43, 0xDC, 0x00, 0x00]);

    let parser = parse(bytes);
    let values = parser.values(bytes);
    assert_eq!(parser.element_count(), 1);
    assert_eq!(values.tag(0), Some(TypeTag::Float32));
    assert_eq!(values.read_float(0).unwrap(), 440.0);
}

#[test]
fn test_string_alignment_invariant() {
    let mut writer = OscWriter::new();
    for len in 0..=33 {
        let text = "x".repeat(len);
        writer.reset();
        writer.write_string(&text).unwrap();

        let encoded = writer.as_bytes();
        assert_eq!(encoded.len() % 4, 0, "length {} not aligned", len);
        assert_eq!(encoded.len(), padded_string_len(len));
        let padding = encoded.len() - len;
        assert!((1..=4).contains(&padding), "length {} has {} nulls", len, padding);
        assert!(encoded[len..].iter().all(|&b| b == 0));
    }
}

#[test]
fn test_every_type_reads_back() {
    let color = Color32::new(255, 128, 0, 64);
    let midi = MidiMessage::new(0, 0x90, 60, 100);
    let time = NtpTimestamp::new(3_900_000_000, 123_456);
    let blob = [0xDE, 0xAD, 0xBE, 0xEF, 0x01];

    let mut writer = OscWriter::new();
    writer.write_address("/all").unwrap();
    writer.write_tags("ifhdsbcrmtTFNI").unwrap();
    writer.write_int(i32::MIN).unwrap();
    writer.write_float(-0.125).unwrap();
    writer.write_int64(i64::MAX).unwrap();
    writer.write_float64(std::f64::consts::PI).unwrap();
    writer.write_string("text").unwrap();
    writer.write_blob(&blob).unwrap();
    writer.write_char('Q').unwrap();
    writer.write_color(color).unwrap();
    writer.write_midi(midi).unwrap();
    writer.write_timestamp(time).unwrap();

    let bytes = writer.as_bytes();
    let parser = parse(bytes);
    let values = parser.values(bytes);

    assert_eq!(values.element_count(), 14);
    assert_eq!(values.read_int(0).unwrap(), i32::MIN);
    assert_eq!(values.read_float(1).unwrap().to_bits(), (-0.125f32).to_bits());
    assert_eq!(values.read_int64(2).unwrap(), i64::MAX);
    assert_eq!(
        values.read_float64(3).unwrap().to_bits(),
        std::f64::consts::PI.to_bits()
    );
    assert_eq!(values.read_str(4).unwrap(), "text");
    assert_eq!(values.blob_slice(5).unwrap(), &blob);
    assert_eq!(values.read_ascii_char(6).unwrap(), 'Q');
    assert_eq!(values.read_color(7).unwrap(), color);
    assert_eq!(values.read_midi(8).unwrap(), midi);
    assert_eq!(values.read_timestamp(9).unwrap(), time);
    assert!(values.read_bool(10).unwrap());
    assert!(!values.read_bool(11).unwrap());
    assert_eq!(values.read_string(12).unwrap(), "Nil");
    assert_eq!(values.read_string(13).unwrap(), "Infinitum");
}

#[test]
fn test_vectors_are_float_runs() {
    let mut writer = OscWriter::new();
    writer
        .write_message("/pos", &Vector3::new(1.0, -2.0, 3.5))
        .unwrap();

    let bytes = writer.as_bytes();
    let parser = parse(bytes);
    let values = parser.values(bytes);
    assert_eq!(values.element_count(), 3);
    assert_eq!(values.read_float(2).unwrap(), 3.5);

    writer
        .write_address_and_tags("/xy", tag_word::VECTOR2)
        .unwrap();
    writer.write_vector2(Vector2::new(0.25, 0.75)).unwrap();
    let bytes = writer.as_bytes();
    let parser = parse(bytes);
    assert_eq!(parser.values(bytes).read_float(1).unwrap(), 0.75);
}

#[test]
fn test_int_read_as_float_reinterprets() {
    let mut writer = OscWriter::new();
    writer.write_address_and_tags("/i", tag_word::INT32).unwrap();
    writer.write_int(1_078_530_011).unwrap();

    let bytes = writer.as_bytes();
    let parser = parse(bytes);
    let float = parser.values(bytes).read_float(0).unwrap();
    assert_eq!(float.to_bits(), 1_078_530_011);
    assert!((float - std::f32::consts::PI).abs() < 1e-6);
}

#[test]
fn test_float_read_as_int_truncates() {
    let mut writer = OscWriter::new();
    writer.write_address_and_tags("/f", tag_word::FLOAT32).unwrap();
    writer.write_float(99.99).unwrap();

    let bytes = writer.as_bytes();
    let parser = parse(bytes);
    assert_eq!(parser.values(bytes).read_int(0).unwrap(), 99);
}

#[test]
fn test_checked_read_rejects_wrong_tag() {
    let mut writer = OscWriter::new();
    writer.write_address_and_tags("/s", tag_word::STRING).unwrap();
    writer.write_string("hello").unwrap();

    let bytes = writer.as_bytes();
    let parser = parse(bytes);
    let values = parser.values(bytes);
    assert!(matches!(
        values.read_float(0),
        Err(Error::TypeMismatch { index: 0, .. })
    ));
    assert!(values.read_midi(0).is_err());
    assert!(values.read_bool(0).is_err());
}

#[test]
fn test_rosc_decodes_writer_output() {
    let mut writer = OscWriter::new();
    writer.write_address("/mixer/ch/3").unwrap();
    writer.write_tags("ifsbhdT").unwrap();
    writer.write_int(-17).unwrap();
    writer.write_float(0.5).unwrap();
    writer.write_string("main").unwrap();
    writer.write_blob(&[1, 2, 3]).unwrap();
    writer.write_int64(1 << 40).unwrap();
    writer.write_float64(-2.5).unwrap();

    let (_, packet) = decoder::decode_udp(writer.as_bytes()).expect("rosc should decode");
    match packet {
        OscPacket::Message(msg) => {
            assert_eq!(msg.addr, "/mixer/ch/3");
            assert_eq!(
                msg.args,
                vec![
                    OscType::Int(-17),
                    OscType::Float(0.5),
                    OscType::String("main".to_string()),
                    OscType::Blob(vec![1, 2, 3]),
                    OscType::Long(1 << 40),
                    OscType::Double(-2.5),
                    OscType::Bool(true),
                ]
            );
        }
        OscPacket::Bundle(_) => panic!("expected message"),
    }
}

#[test]
fn test_parser_reads_rosc_output() {
    let packet = OscPacket::Message(OscMessage {
        addr: "/avatar/parameters/VelocityX".to_string(),
        args: vec![
            OscType::Float(1.25),
            OscType::Color(OscColor {
                red: 1,
                green: 2,
                blue: 3,
                alpha: 4,
            }),
            OscType::Midi(OscMidiMessage {
                port: 5,
                status: 0x80,
                data1: 64,
                data2: 0,
            }),
            OscType::Time(OscTime {
                seconds: 10,
                fractional: 20,
            }),
            OscType::Char('z'),
            OscType::Nil,
        ],
    });
    let encoded = encoder::encode(&packet).expect("rosc should encode");

    let parser = parse(&encoded);
    let values = parser.values(&encoded);
    assert_eq!(parser.address_bytes(&encoded), b"/avatar/parameters/VelocityX");
    assert_eq!(values.element_count(), 6);
    assert_eq!(values.read_float(0).unwrap(), 1.25);
    assert_eq!(values.read_color(1).unwrap(), Color32::new(1, 2, 3, 4));
    assert_eq!(values.read_midi(2).unwrap(), MidiMessage::new(5, 0x80, 64, 0));
    assert_eq!(values.read_timestamp(3).unwrap(), NtpTimestamp::new(10, 20));
    assert_eq!(values.read_ascii_char(4).unwrap(), 'z');
    assert_eq!(values.tag(5), Some(TypeTag::Nil));
}

#[test]
fn test_rosc_decodes_written_bundle() {
    let mut writer = OscWriter::new();
    writer
        .write_bundle_header(NtpTimestamp::new(1, 2))
        .unwrap();
    for value in [1, 2] {
        let mark = writer.begin_bundle_element().unwrap();
        writer.write_address("/n").unwrap();
        writer.write_tag_word(tag_word::INT32).unwrap();
        writer.write_int(value).unwrap();
        writer.end_bundle_element(mark).unwrap();
    }
    assert!(is_bundle(writer.as_bytes()));

    let (_, packet) = decoder::decode_udp(writer.as_bytes()).expect("rosc should decode");
    match packet {
        OscPacket::Bundle(OscBundle { timetag, content }) => {
            assert_eq!(timetag, OscTime { seconds: 1, fractional: 2 });
            assert_eq!(content.len(), 2);
        }
        OscPacket::Message(_) => panic!("expected bundle"),
    }
}
