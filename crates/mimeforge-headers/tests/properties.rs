//! Property tests for header construction and encoding.

use mimeforge_headers::encoding::decode_encoded_words;
use mimeforge_headers::{Config, Header, HeaderEncoding, HeaderFactory};
use proptest::prelude::*;

fn charset() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["utf-8", "iso-8859-1", "windows-1252", "iso-8859-15"])
}

proptest! {
    #[test]
    fn prop_charset_snapshot(first in charset(), second in charset()) {
        let mut factory = HeaderFactory::default();
        factory.charset_changed(first);
        let h1 = factory.create_text_header("Subject", None).unwrap();
        factory.charset_changed(second);
        let h2 = factory.create_text_header("Subject", None).unwrap();

        prop_assert_eq!(h1.charset(), Some(first));
        prop_assert_eq!(h2.charset(), Some(second));
        prop_assert_eq!(factory.header_encoder().charset(), second);
        prop_assert_eq!(factory.parameter_encoder().charset(), second);
    }

    #[test]
    fn prop_parameter_order(names in prop::collection::hash_set("[a-z]{1,8}", 1..6)) {
        let names: Vec<String> = names.into_iter().collect();
        let params: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "v")).collect();

        let factory = HeaderFactory::default();
        let header = factory
            .create_parameterized_header("Content-Type", Some("text/plain"), &params)
            .unwrap();

        let seen: Vec<&str> = header.parameters().map(|(name, _)| name).collect();
        prop_assert_eq!(&seen, &names.iter().map(String::as_str).collect::<Vec<_>>());

        let body = header.field_body().unwrap();
        let rendered: Vec<&str> = body
            .split("; ")
            .skip(1)
            .filter_map(|p| p.split_once('=').map(|(name, _)| name))
            .collect();
        prop_assert_eq!(rendered, seen);
    }

    #[test]
    fn prop_q_words_decode_to_input(text in "[a-zA-Z0-9äöüéèß€ ]{1,120}") {
        let factory = HeaderFactory::default();
        let header = factory.create_text_header("Subject", Some(text.as_str())).unwrap();
        let body = header.field_body().unwrap();
        let unfolded = body.replace("\r\n", "");
        prop_assert_eq!(decode_encoded_words(&unfolded).unwrap(), text);
    }

    #[test]
    fn prop_b_words_decode_to_input(text in "[a-zA-Z0-9äöüéèß€ ]{1,120}") {
        let config = Config::builder().header_encoding(HeaderEncoding::Base64).build();
        let factory = HeaderFactory::from_config(&config);
        let header = factory.create_text_header("Subject", Some(text.as_str())).unwrap();
        let unfolded = header.field_body().unwrap().replace("\r\n", "");
        prop_assert_eq!(decode_encoded_words(&unfolded).unwrap(), text);
    }
}
