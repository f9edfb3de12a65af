//! Property-based tests for the wire codec and the audio ring buffer.
//!
//! - Escaping then embedding a prompt and parsing the frame back yields the
//!   original text.
//! - `audio/pcm;rate=R` parts decode to `raw / 32768` per sample at rate `R`,
//!   regardless of whitespace or case in the MIME type. Rates above the
//!   supported maximum are rejected.
//! - A ring buffer of capacity C keeps exactly the last C samples written, and
//!   short reads are padded with zeros.

use base64::Engine;
use gemini_live::audio::{AudioRingBuffer, MAX_SAMPLE_RATE};
use gemini_live::protocol::{decode_part, encode_prompt};
use gemini_live::{InteractionPart, json_escape};
use proptest::prelude::*;
use serde_json::{Value, json};

/// Text biased towards the characters that need escaping.
fn arb_prompt() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just('\\'),
            Just('"'),
            Just('/'),
            Just('\''),
            Just('\u{08}'),
            Just('\u{0C}'),
            Just('\n'),
            Just('\r'),
            Just('\t'),
            Just('\u{01}'),
            any::<char>(),
        ],
        0..64,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

fn arb_mime(rate: u32) -> impl Strategy<Value = String> {
    (" {0,2}", "[Aa][Uu][Dd][Ii][Oo]/[Pp][Cc][Mm]", " {0,2}", "[Rr][Aa][Tt][Ee]").prop_map(
        move |(pad, primary, pad2, key)| format!("{pad}{primary}{pad2};{pad}{key}={rate}{pad2}"),
    )
}

fn pcm_base64(samples: &[i16]) -> String {
    let bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Escaped text embedded in a prompt frame parses back unchanged.
    #[test]
    fn prop_prompt_round_trips_through_json(prompt in arb_prompt()) {
        let frame = encode_prompt(&prompt);
        let parsed: Value = serde_json::from_str(&frame)
            .map_err(|e| TestCaseError::fail(format!("{} in {}", e, frame)))?;
        prop_assert_eq!(parsed["realtimeInput"]["text"].as_str(), Some(prompt.as_str()));
    }

    /// The escaped form never contains a raw quote or control character.
    #[test]
    fn prop_escape_output_is_literal_safe(text in arb_prompt()) {
        let escaped = json_escape(&text);
        let quoted = format!("\"{}\"", escaped);
        let parsed: String = serde_json::from_str(&quoted)
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert_eq!(&parsed, &text);
        prop_assert!(!escaped.chars().any(|c| (c as u32) < 0x20));
    }

    /// PCM parts decode sample by sample, at the advertised rate.
    #[test]
    fn prop_pcm_part_decodes_exactly(
        (rate, mime) in (1u32..=MAX_SAMPLE_RATE).prop_flat_map(|rate| (Just(rate), arb_mime(rate))),
        samples in prop::collection::vec(any::<i16>(), 0..256),
    ) {
        let part = json!({"inlineData": {"mimeType": mime, "data": pcm_base64(&samples)}});
        match decode_part(&part) {
            InteractionPart::Audio(audio) => {
                prop_assert_eq!(audio.sample_rate, rate);
                prop_assert_eq!(audio.samples.len(), samples.len());
                for (decoded, raw) in audio.samples.iter().zip(&samples) {
                    prop_assert_eq!(*decoded, *raw as f32 / 32768.0);
                    prop_assert!((-1.0..1.0).contains(decoded));
                }
            }
            other => prop_assert!(false, "expected audio part, got {:?}", other),
        }
    }

    /// A trailing odd byte is ignored by the part decoder.
    #[test]
    fn prop_pcm_odd_trailing_byte_ignored(
        samples in prop::collection::vec(any::<i16>(), 0..64),
        extra in any::<u8>(),
    ) {
        let mut bytes: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        bytes.push(extra);
        let data = base64::engine::general_purpose::STANDARD.encode(&bytes);
        let part = json!({"inlineData": {"mimeType": "audio/pcm;rate=16000", "data": data}});
        let audio = decode_part(&part);
        prop_assert_eq!(audio.as_audio().map(|a| a.samples.len()), Some(samples.len()));
    }

    /// Rates above the supported maximum never produce an audio part.
    #[test]
    fn prop_pcm_rate_above_maximum_is_invalid(rate in (MAX_SAMPLE_RATE + 1)..=u32::MAX) {
        let part = json!({
            "inlineData": {"mimeType": format!("audio/pcm;rate={rate}"), "data": pcm_base64(&[1])}
        });
        prop_assert!(decode_part(&part).is_invalid());
    }

    /// Writing at least `capacity` samples leaves exactly the last `capacity` of them.
    #[test]
    fn prop_ring_keeps_newest(
        capacity in 1usize..64,
        writes in prop::collection::vec(prop::collection::vec(-1.0f32..1.0, 0..40), 1..8),
    ) {
        let ring = AudioRingBuffer::new(capacity).unwrap();
        let mut all = Vec::new();
        for chunk in &writes {
            ring.write(chunk);
            all.extend_from_slice(chunk);
        }
        prop_assert_eq!(ring.drain_delta(), all.len());

        let expected: Vec<f32> = all[all.len().saturating_sub(capacity)..].to_vec();
        let mut out = vec![9.0f32; capacity];
        let delivered = ring.read(&mut out);
        prop_assert_eq!(delivered, expected.len());
        prop_assert_eq!(&out[..delivered], &expected[..]);
        prop_assert!(out[delivered..].iter().all(|s| *s == 0.0));
    }

    /// A short write followed by a larger read returns the samples then zeros.
    #[test]
    fn prop_ring_short_read_zero_fills(
        samples in prop::collection::vec(-1.0f32..1.0, 0..32),
        slack in 0usize..32,
    ) {
        let ring = AudioRingBuffer::new(32).unwrap();
        ring.write(&samples);

        let mut out = vec![5.0f32; samples.len() + slack];
        prop_assert_eq!(ring.read(&mut out), samples.len());
        prop_assert_eq!(&out[..samples.len()], &samples[..]);
        prop_assert!(out[samples.len()..].iter().all(|s| *s == 0.0));
        prop_assert!(ring.is_empty());
    }
}
