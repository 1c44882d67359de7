//! Integration tests for the header factory.
//!
//! Recording encoders stand in for the default encoders so the tests can
//! observe charset notifications and duplication from the outside.

use std::sync::{Arc, Mutex, PoisonError};

use mimeforge_headers::encoder::{QpHeaderEncoder, Rfc2231Encoder};
use mimeforge_headers::encoding::decode_encoded_words;
use mimeforge_headers::{
    Encoder, Error, FieldBodyModel, Grammar, Header, HeaderEncoder, HeaderFactory, HeaderKind, Mailbox,
    ParameterEncoder, Result,
};

/// Charset notifications seen by one encoder instance.
#[derive(Debug, Default)]
struct Log(Mutex<Vec<String>>);

impl Log {
    fn push(&self, charset: &str) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(charset.to_string());
    }

    fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Header encoder that records every charset notification.
#[derive(Debug)]
struct RecordingHeaderEncoder {
    inner: QpHeaderEncoder,
    log: Arc<Log>,
}

impl RecordingHeaderEncoder {
    fn new(charset: &str) -> (Arc<Self>, Arc<Log>) {
        let log = Arc::new(Log::default());
        let encoder = Arc::new(Self {
            inner: QpHeaderEncoder::new(charset),
            log: Arc::clone(&log),
        });
        (encoder, log)
    }
}

impl Encoder for RecordingHeaderEncoder {
    fn encode(
        &self,
        text: &str,
        first_line_offset: usize,
        max_line_length: usize,
        charset: Option<&str>,
    ) -> Result<String> {
        self.inner
            .encode(text, first_line_offset, max_line_length, charset)
    }

    fn charset_changed(&self, charset: &str) {
        self.log.push(charset);
        self.inner.charset_changed(charset);
    }

    fn charset(&self) -> String {
        self.inner.charset()
    }
}

impl HeaderEncoder for RecordingHeaderEncoder {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn duplicate(&self) -> Arc<dyn HeaderEncoder> {
        Arc::new(Self {
            inner: QpHeaderEncoder::new(self.inner.charset()),
            log: Arc::new(Log::default()),
        })
    }
}

/// Parameter encoder that records every charset notification.
#[derive(Debug)]
struct RecordingParameterEncoder {
    inner: Rfc2231Encoder,
    log: Arc<Log>,
}

impl RecordingParameterEncoder {
    fn new(charset: &str) -> (Arc<Self>, Arc<Log>) {
        let log = Arc::new(Log::default());
        let encoder = Arc::new(Self {
            inner: Rfc2231Encoder::new(charset),
            log: Arc::clone(&log),
        });
        (encoder, log)
    }
}

impl Encoder for RecordingParameterEncoder {
    fn encode(
        &self,
        text: &str,
        first_line_offset: usize,
        max_line_length: usize,
        charset: Option<&str>,
    ) -> Result<String> {
        self.inner
            .encode(text, first_line_offset, max_line_length, charset)
    }

    fn charset_changed(&self, charset: &str) {
        self.log.push(charset);
        self.inner.charset_changed(charset);
    }

    fn charset(&self) -> String {
        self.inner.charset()
    }
}

impl ParameterEncoder for RecordingParameterEncoder {
    fn duplicate(&self) -> Arc<dyn ParameterEncoder> {
        Arc::new(Self {
            inner: Rfc2231Encoder::new(self.inner.charset()),
            log: Arc::new(Log::default()),
        })
    }
}

struct Fixture {
    factory: HeaderFactory,
    header_log: Arc<Log>,
    param_log: Arc<Log>,
}

fn fixture(charset: Option<&str>) -> Fixture {
    let (encoder, header_log) = RecordingHeaderEncoder::new("utf-8");
    let (param_encoder, param_log) = RecordingParameterEncoder::new("utf-8");
    let factory = HeaderFactory::new(
        encoder,
        param_encoder,
        Arc::new(Grammar::new()),
        charset.map(str::to_string),
    );
    Fixture {
        factory,
        header_log,
        param_log,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mimeforge_headers=trace")
        .with_test_writer()
        .try_init();
}

#[test]
fn test_unset_values_still_get_charset() {
    let Fixture { factory, .. } = fixture(Some("iso-8859-1"));

    let headers: Vec<Box<dyn Header>> = vec![
        Box::new(factory.create_mailbox_header("To", None).unwrap()),
        Box::new(factory.create_date_header("Date", None).unwrap()),
        Box::new(factory.create_text_header("Subject", None).unwrap()),
        Box::new(
            factory
                .create_parameterized_header("Content-Type", None, &[])
                .unwrap(),
        ),
        Box::new(factory.create_id_header("Message-ID", None).unwrap()),
        Box::new(factory.create_path_header("Return-Path", None).unwrap()),
    ];

    for header in &headers {
        assert!(header.field_body_model().is_unset(), "{}", header.name());
        assert_eq!(header.charset(), Some("iso-8859-1"), "{}", header.name());
    }
}

#[test]
fn test_no_factory_charset_leaves_headers_without_override() {
    let Fixture { factory, .. } = fixture(None);
    for kind in HeaderKind::ALL {
        let header = factory.create(kind, "X-Test", None).unwrap();
        assert_eq!(header.charset(), None);
    }
}

#[test]
fn test_charset_is_snapshot_at_creation() {
    init_tracing();
    let Fixture { mut factory, .. } = fixture(Some("utf-8"));

    let h1 = factory.create_text_header("Subject", Some("café")).unwrap();
    factory.charset_changed("iso-8859-1");
    let h2 = factory.create_text_header("Subject", Some("café")).unwrap();

    assert_eq!(h1.charset(), Some("utf-8"));
    assert_eq!(h2.charset(), Some("iso-8859-1"));
    assert_eq!(h1.field_body().unwrap(), "=?utf-8?Q?caf=C3=A9?=");
    assert_eq!(h2.field_body().unwrap(), "=?iso-8859-1?Q?caf=E9?=");
}

#[test]
fn test_parameter_encoder_only_for_content_disposition() {
    let Fixture { factory, .. } = fixture(None);

    let disposition = factory
        .create_parameterized_header("Content-Disposition", Some("attachment"), &[("filename", "f.txt")])
        .unwrap();
    assert!(Arc::ptr_eq(
        disposition.parameter_encoder().unwrap(),
        factory.parameter_encoder()
    ));

    let shouting = factory
        .create_parameterized_header("CONTENT-DISPOSITION", Some("inline"), &[])
        .unwrap();
    assert!(shouting.parameter_encoder().is_some());

    let content_type = factory
        .create_parameterized_header("Content-Type", Some("text/plain"), &[("charset", "utf-8")])
        .unwrap();
    assert!(content_type.parameter_encoder().is_none());
    assert!(content_type.header_encoder().is_some());
}

#[test]
fn test_encoder_wiring_per_kind() {
    let Fixture { factory, .. } = fixture(None);
    for kind in HeaderKind::ALL {
        let header = factory.create(kind, "Content-Disposition", None).unwrap();
        let wiring = kind.wiring("Content-Disposition");
        assert_eq!(header.header_encoder().is_some(), wiring.header_encoder, "{kind:?}");
        assert_eq!(header.parameter_encoder().is_some(), wiring.parameter_encoder, "{kind:?}");
    }
}

#[test]
fn test_charset_changed_reaches_both_encoders() {
    let Fixture {
        mut factory,
        header_log,
        param_log,
    } = fixture(None);
    let before = factory
        .create_mailbox_header("From", Some(vec![Mailbox::with_name("Zoë", "zoe@example.com")]))
        .unwrap();
    let subject = factory.create_text_header("Subject", Some("café")).unwrap();
    let disposition = factory
        .create_parameterized_header("Content-Disposition", Some("attachment"), &[("filename", "é.txt")])
        .unwrap();
    let wire_before = [
        before.to_wire().unwrap(),
        subject.to_wire().unwrap(),
        disposition.to_wire().unwrap(),
    ];

    factory.charset_changed("iso-8859-1");

    assert_eq!(header_log.entries(), ["iso-8859-1"]);
    assert_eq!(param_log.entries(), ["iso-8859-1"]);
    assert_eq!(factory.charset(), Some("iso-8859-1"));
    assert_eq!(before.charset(), None);

    let wire_after = [
        before.to_wire().unwrap(),
        subject.to_wire().unwrap(),
        disposition.to_wire().unwrap(),
    ];
    assert_eq!(wire_before, wire_after);
    assert_eq!(wire_after[1], "Subject: =?utf-8?Q?caf=C3=A9?=\r\n");
    assert_eq!(
        wire_after[2],
        "Content-Disposition: attachment; filename*=utf-8''%C3%A9.txt\r\n"
    );
}

#[test]
fn test_charset_changed_is_idempotent() {
    let Fixture {
        mut factory,
        header_log,
        ..
    } = fixture(None);
    factory.charset_changed("iso-8859-1");
    let first = factory.create_text_header("Subject", Some("é")).unwrap();
    factory.charset_changed("iso-8859-1");
    let second = factory.create_text_header("Subject", Some("é")).unwrap();

    assert_eq!(header_log.entries().len(), 2);
    assert_eq!(factory.header_encoder().charset(), "iso-8859-1");
    assert_eq!(first.to_wire().unwrap(), second.to_wire().unwrap());
}

#[test]
fn test_duplicate_is_independent() {
    let Fixture {
        mut factory,
        header_log,
        param_log,
    } = fixture(None);
    let mut copy = factory.clone();

    factory.charset_changed("iso-8859-1");
    assert_eq!(copy.header_encoder().charset(), "utf-8");
    assert_eq!(copy.parameter_encoder().charset(), "utf-8");
    assert_eq!(copy.charset(), None);

    copy.charset_changed("koi8-r");
    assert_eq!(factory.header_encoder().charset(), "iso-8859-1");
    assert_eq!(factory.parameter_encoder().charset(), "iso-8859-1");
    assert_eq!(header_log.entries(), ["iso-8859-1"]);
    assert_eq!(param_log.entries(), ["iso-8859-1"]);
    assert!(Arc::ptr_eq(factory.grammar(), copy.grammar()));
}

#[test]
fn test_date_header_round_trip() {
    let Fixture { factory, .. } = fixture(Some("utf-8"));
    let date = factory.create_date_header("Date", Some(1_700_000_000)).unwrap();

    assert_eq!(date.field_body_model(), FieldBodyModel::Timestamp(Some(1_700_000_000)));
    assert_eq!(date.timestamp(), Some(1_700_000_000));
    assert!(date.header_encoder().is_none());
    assert_eq!(date.to_wire().unwrap(), "Date: Tue, 14 Nov 2023 22:13:20 +0000\r\n");
}

#[test]
fn test_parameter_order_preserved() {
    let Fixture { factory, .. } = fixture(None);
    let header = factory
        .create_parameterized_header(
            "Content-Type",
            Some("text/plain"),
            &[("format", "flowed"), ("charset", "utf-8"), ("delsp", "yes")],
        )
        .unwrap();
    assert_eq!(
        header.to_wire().unwrap(),
        "Content-Type: text/plain; format=flowed; charset=utf-8; delsp=yes\r\n"
    );
}

#[test]
fn test_parameters_use_header_charset() {
    let Fixture { mut factory, .. } = fixture(None);
    factory.charset_changed("iso-8859-1");
    let header = factory
        .create_parameterized_header("Content-Disposition", Some("attachment"), &[("filename", "é.txt")])
        .unwrap();
    assert_eq!(header.charset(), Some("iso-8859-1"));
    assert_eq!(
        header.field_body().unwrap(),
        "attachment; filename*=iso-8859-1''%E9.txt"
    );
}

#[test]
fn test_full_header_block() {
    let Fixture { factory, .. } = fixture(None);
    let mut wire = String::new();
    wire.push_str(
        &factory
            .create_mailbox_header(
                "From",
                Some(vec![Mailbox::with_name("Jöhn Doe", "john@example.com")]),
            )
            .unwrap()
            .to_wire()
            .unwrap(),
    );
    wire.push_str(
        &factory
            .create_id_header("Message-ID", Some(vec!["<1234@example.com>".into()]))
            .unwrap()
            .to_wire()
            .unwrap(),
    );
    wire.push_str(
        &factory
            .create_path_header("Return-Path", Some("bounce@example.com"))
            .unwrap()
            .to_wire()
            .unwrap(),
    );

    assert_eq!(
        wire,
        concat!(
            "From: =?utf-8?Q?J=C3=B6hn?= Doe <john@example.com>\r\n",
            "Message-ID: <1234@example.com>\r\n",
            "Return-Path: <bounce@example.com>\r\n",
        )
    );

    let from = wire.lines().next().unwrap();
    assert_eq!(
        decode_encoded_words(from.trim_start_matches("From: ")).unwrap(),
        "Jöhn Doe <john@example.com>"
    );
}

#[test]
fn test_invalid_value_fails_creation() {
    let Fixture { factory, .. } = fixture(None);
    assert!(factory.create_id_header("Message-ID", Some(vec!["nope".into()])).is_err());
    assert!(factory.create_path_header("Return-Path", Some("a b@c")).is_err());
    assert!(factory.create_date_header("Date", Some(i64::MAX)).is_err());
    assert!(matches!(
        factory.create_date_header("Date", Some(300_000_000_000)),
        Err(Error::InvalidDate(300_000_000_000))
    ));
    assert!(matches!(
        factory.create_date_header("Date", Some(-100_000_000_000)),
        Err(Error::InvalidDate(_))
    ));
}
