#[cfg(test)]
mod tests {
    use crate::encoder::{build_patch, build_patch_utf16, build_patch_with};
    use crate::errors::EncodeError;
    use crate::types::{PatchConfig, PayloadEncoding};
    use abraham_types::{PatchOp, MAX_RUN_LEN};
    use abraham_verifier::decoder::{apply_patch, changed_count, decode_patch};
    use proptest::prelude::*;

    fn wide() -> PatchConfig {
        PatchConfig { payload: PayloadEncoding::Wide, ..PatchConfig::default() }
    }

    fn replay(old: &str, encoded: &[u8]) -> String {
        let ops = decode_patch(encoded).unwrap();
        apply_patch(old, &ops).unwrap()
    }

    #[test]
    fn test_unchanged_text_is_single_equal() {
        let patch = build_patch("hello", "hello").unwrap();
        assert_eq!(&patch.encoded[..], &[0x00, 0x00, 0x05]);
        assert_eq!(patch.changed_count, 0);
    }

    #[test]
    fn test_empty_texts() {
        let patch = build_patch("", "").unwrap();
        assert!(patch.encoded.is_empty());
        assert_eq!(patch.to_hex(), "0x");
        assert_eq!(patch.changed_count, 0);
    }

    #[test]
    fn test_insert_layout() {
        let patch = build_patch("abc", "ab123c").unwrap();
        assert_eq!(
            &patch.encoded[..],
            &[0x00, 0x00, 0x02, 0x02, 0x00, 0x03, b'1', b'2', b'3', 0x00, 0x00, 0x01]
        );
        assert_eq!(patch.to_hex(), "0x000002020003313233000001");
        assert_eq!(patch.changed_count, 3);
    }

    #[test]
    fn test_delete_layout() {
        let patch = build_patch("hello world", "hello").unwrap();
        assert_eq!(&patch.encoded[..], &[0x00, 0x00, 0x05, 0x01, 0x00, 0x06]);
        assert_eq!(patch.changed_count, 6);
        assert_eq!(replay("hello world", &patch.encoded), "hello");
    }

    #[test]
    fn test_long_insert_is_split() {
        let new = "a".repeat(70_000);
        let patch = build_patch("", &new).unwrap();
        let ops = decode_patch(&patch.encoded).unwrap();

        assert!(ops.len() > 1);
        assert!(ops.iter().all(|op| matches!(op, PatchOp::Insert { .. })));
        assert!(ops.iter().all(|op| op.len() <= MAX_RUN_LEN));
        assert_eq!(ops.iter().map(PatchOp::len).sum::<usize>(), 70_000);
        assert_eq!(ops[0].len(), 65_535);
        assert_eq!(patch.changed_count, 70_000);
        assert_eq!(patch.encoded.len(), 2 * 3 + 70_000);
        assert_eq!(replay("", &patch.encoded), new);
    }

    #[test]
    fn test_long_equal_is_split() {
        let old = "x".repeat(70_000);
        let new = format!("{old}y");
        let patch = build_patch(&old, &new).unwrap();
        let ops = decode_patch(&patch.encoded).unwrap();

        assert_eq!(
            ops,
            vec![
                PatchOp::Equal { len: 65_535 },
                PatchOp::Equal { len: 4_465 },
                PatchOp::Insert { bytes: b"y".to_vec() },
            ]
        );
        assert_eq!(patch.changed_count, 1);
    }

    #[test]
    fn test_latin1_insert_rejects_wide_characters() {
        let err = build_patch("a", "a\u{4e16}").unwrap_err();
        assert_eq!(err, EncodeError::UnencodableCharacter { index: 1, code_unit: 0x4e16 });
    }

    #[test]
    fn test_latin1_supplement_is_encodable() {
        let patch = build_patch("cafe", "caf\u{e9} cr\u{e8}me").unwrap();
        assert_eq!(replay("cafe", &patch.encoded), "caf\u{e9} cr\u{e8}me");
    }

    #[test]
    fn test_deleting_wide_characters_is_fine() {
        let patch = build_patch("\u{4e16}\u{754c}", "").unwrap();
        assert_eq!(&patch.encoded[..], &[0x01, 0x00, 0x02]);
        assert_eq!(patch.changed_count, 2);
    }

    #[test]
    fn test_wide_payload_round_trip() {
        let old = "hello";
        let new = "hello \u{4e16}\u{754c} \u{1F600}";
        let patch = build_patch_with(&wide(), old, new).unwrap();
        let ops = decode_patch(&patch.encoded).unwrap();
        assert!(ops.iter().any(|op| matches!(op, PatchOp::InsertWide { .. })));
        assert_eq!(apply_patch(old, &ops).unwrap(), new);
        // Surrogate pair counts as two characters.
        assert_eq!(patch.changed_count, 1 + 2 + 1 + 2);
    }

    #[test]
    fn test_wide_mode_keeps_narrow_inserts_narrow() {
        let patch = build_patch_with(&wide(), "ab", "a-b").unwrap();
        assert_eq!(patch.encoded, build_patch("ab", "a-b").unwrap().encoded);
    }

    #[test]
    fn test_unpaired_surrogates_rejected() {
        let cfg = PatchConfig::default();
        assert_eq!(
            build_patch_utf16(&cfg, &[0x61], &[0xD800, 0x61]),
            Err(EncodeError::InvalidCharacterEncoding { index: 0, code_unit: 0xD800 })
        );
        assert_eq!(
            build_patch_utf16(&cfg, &[0x61, 0xDC00], &[0x61]),
            Err(EncodeError::InvalidCharacterEncoding { index: 1, code_unit: 0xDC00 })
        );
        // Trailing high surrogate.
        assert!(build_patch_utf16(&cfg, &[], &[0x61, 0xD83D]).is_err());
    }

    #[test]
    fn test_input_size_bound() {
        let cfg = PatchConfig { max_chars: Some(4), ..PatchConfig::default() };
        assert_eq!(
            build_patch_with(&cfg, "abc", "abcde"),
            Err(EncodeError::InputTooLarge { len: 5, max: 4 })
        );
        assert!(build_patch_with(&cfg, "abc", "abcd").is_ok());
    }

    #[test]
    fn test_efficiency_trades_changes_for_fewer_ops() {
        let (old, new) = ("abxyzcd", "12xyz34");
        let raw = build_patch_with(&PatchConfig { edit_cost: 0, ..PatchConfig::default() }, old, new).unwrap();
        let cleaned = build_patch(old, new).unwrap();

        assert_eq!(decode_patch(&raw.encoded).unwrap().len(), 5);
        assert_eq!(raw.changed_count, 8);
        assert_eq!(decode_patch(&cleaned.encoded).unwrap().len(), 2);
        assert_eq!(cleaned.changed_count, 14);
        assert_eq!(replay(old, &raw.encoded), new);
        assert_eq!(replay(old, &cleaned.encoded), new);
    }

    #[test]
    fn test_efficiency_keeps_wide_equalities_in_latin1_mode() {
        let (old, new) = ("a\u{2026}b", "x\u{2026}y");
        let patch = build_patch(old, new).unwrap();
        assert_eq!(patch.to_hex(), "0x0100010200017800000101000102000179");
        assert_eq!(patch.changed_count, 4);
        assert_eq!(replay(old, &patch.encoded), new);

        // Wide mode may still fold the equality into the edits.
        let patch = build_patch_with(&wide(), old, new).unwrap();
        assert_eq!(decode_patch(&patch.encoded).unwrap().len(), 2);
        assert_eq!(replay(old, &patch.encoded), new);
    }

    #[test]
    fn test_ascii_edits_around_curly_quotes() {
        let old = "Say \u{201c}hi\u{201d} to me";
        let new = "Say \u{201c}yo\u{201d} to us";
        let patch = build_patch(old, new).unwrap();
        assert_eq!(replay(old, &patch.encoded), new);
    }

    #[test]
    fn test_prompt_edit_round_trip() {
        let old = "You are Abraham, an autonomous artist. You create one artwork per day.";
        let new = "You are Abraham, an autonomous artificial artist. You create a new artwork every day!";
        let patch = build_patch(old, new).unwrap();
        let ops = decode_patch(&patch.encoded).unwrap();
        assert_eq!(apply_patch(old, &ops).unwrap(), new);
        assert_eq!(changed_count(&ops), patch.changed_count);
        assert!(patch.changed_count > 0);
    }

    proptest! {
        #[test]
        fn prop_round_trip_small_alphabet(a in "[a-c ]{0,48}", b in "[a-c ]{0,48}") {
            let patch = build_patch(&a, &b).unwrap();
            let ops = decode_patch(&patch.encoded).unwrap();
            prop_assert_eq!(apply_patch(&a, &ops).unwrap(), b);
            prop_assert_eq!(changed_count(&ops), patch.changed_count);
            prop_assert!(ops.iter().all(|op| !op.is_empty()));
        }

        #[test]
        fn prop_round_trip_any_text_wide(a in any::<String>(), b in any::<String>()) {
            let patch = build_patch_with(&wide(), &a, &b).unwrap();
            let ops = decode_patch(&patch.encoded).unwrap();
            prop_assert_eq!(apply_patch(&a, &ops).unwrap(), b);
            prop_assert_eq!(changed_count(&ops), patch.changed_count);
        }

        #[test]
        fn prop_identity_has_no_changes(a in any::<String>()) {
            let patch = build_patch(&a, &a).unwrap();
            let ops = decode_patch(&patch.encoded).unwrap();
            prop_assert_eq!(patch.changed_count, 0);
            let all_equal = ops.iter().all(|op| matches!(op, PatchOp::Equal { .. }));
            prop_assert!(all_equal);
        }

        #[test]
        fn prop_changed_count_bounded(a in "[a-z]{0,32}", b in "[a-z]{0,32}") {
            let patch = build_patch(&a, &b).unwrap();
            // Never worse than deleting everything and inserting everything.
            prop_assert!(patch.changed_count <= (a.len() + b.len()) as u64);
        }
    }
}
