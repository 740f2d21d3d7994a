//! Replays curated single-step vectors (inline JSON), then any generated
//! vector files found on disk. Generated files are optional; run
//! `gen_p6502_tests` to produce them.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use wirepulse_cpu_validation::{TestCase, run_case};

/// Hand-computed reference cases. P bit layout: C=01 Z=02 I=04 D=08 B=10
/// V=40 N=80; the power-on P is $04.
const CURATED: &str = r#"[
  {
    "name": "lda_imm_loads_and_sets_flags",
    "initial": { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 66, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 4 },
    "ram": [[512, 169], [513, 66]]
  },
  {
    "name": "lda_imm_zero_sets_z",
    "initial": { "a": 7, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 6 },
    "ram": [[512, 169], [513, 0]]
  },
  {
    "name": "adc_50_plus_50_sets_v_and_n",
    "initial": { "a": 80, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 160, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 196 },
    "ram": [[512, 105], [513, 80]]
  },
  {
    "name": "adc_carry_out_sets_c_and_z",
    "initial": { "a": 255, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 5 },
    "final":   { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 7 },
    "ram": [[512, 105], [513, 0]]
  },
  {
    "name": "sbc_borrow_clears_c",
    "initial": { "a": 32, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 5 },
    "final":   { "a": 208, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 132 },
    "ram": [[512, 233], [513, 80]]
  },
  {
    "name": "cmp_equal_sets_c_and_z",
    "initial": { "a": 48, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 48, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 7 },
    "ram": [[512, 201], [513, 48]]
  },
  {
    "name": "pha_with_sp_zero_wraps",
    "initial": { "a": 90, "x": 0, "y": 0, "sp": 0, "pc": 512, "p": 4 },
    "final":   { "a": 90, "x": 0, "y": 0, "sp": 255, "pc": 513, "p": 4 },
    "ram": [[512, 72]],
    "ram_final": [[256, 90]]
  },
  {
    "name": "bne_taken_backward",
    "initial": { "a": 0, "x": 3, "y": 0, "sp": 255, "pc": 515, "p": 4 },
    "final":   { "a": 0, "x": 3, "y": 0, "sp": 255, "pc": 514, "p": 4 },
    "ram": [[515, 208], [516, 253]]
  },
  {
    "name": "beq_not_taken_falls_through",
    "initial": { "a": 1, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 1, "x": 0, "y": 0, "sp": 255, "pc": 514, "p": 4 },
    "ram": [[512, 240], [513, 16]]
  },
  {
    "name": "jsr_pushes_return_minus_one",
    "initial": { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 0, "x": 0, "y": 0, "sp": 253, "pc": 768, "p": 4 },
    "ram": [[512, 32], [513, 0], [514, 3]],
    "ram_final": [[511, 2], [510, 2]]
  },
  {
    "name": "rts_pulls_and_adds_one",
    "initial": { "a": 0, "x": 0, "y": 0, "sp": 253, "pc": 768, "p": 4 },
    "final":   { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 515, "p": 4 },
    "ram": [[768, 96], [510, 2], [511, 2]]
  },
  {
    "name": "hlt_stops",
    "initial": { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 513, "p": 4, "halted": true },
    "ram": [[512, 2]]
  },
  {
    "name": "unknown_opcode_halts",
    "initial": { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 512, "p": 4 },
    "final":   { "a": 0, "x": 0, "y": 0, "sp": 255, "pc": 513, "p": 4, "halted": true },
    "ram": [[512, 255]]
  },
  {
    "name": "tsx_copies_sp_and_sets_n",
    "initial": { "a": 0, "x": 0, "y": 0, "sp": 254, "pc": 512, "p": 4 },
    "final":   { "a": 0, "x": 254, "y": 0, "sp": 254, "pc": 513, "p": 132 },
    "ram": [[512, 186]]
  }
]"#;

#[test]
fn curated_vectors_pass() {
    let cases: Vec<TestCase> = serde_json::from_str(CURATED).expect("curated JSON parses");
    assert!(cases.len() >= 10);
    for case in &cases {
        if let Err(mismatch) = run_case(case) {
            panic!("{mismatch}");
        }
    }
}

#[test]
fn generated_vectors_pass_if_present() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("vectors");
    let Ok(entries) = std::fs::read_dir(&dir) else {
        // No generated vectors; nothing to replay.
        return;
    };
    let mut total = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_none_or(|e| e != "gz") {
            continue;
        }
        let file = std::fs::File::open(&path).expect("open vector file");
        let mut json = String::new();
        GzDecoder::new(file)
            .read_to_string(&mut json)
            .expect("decompress vector file");
        let cases: Vec<TestCase> = serde_json::from_str(&json).expect("vector JSON parses");
        for case in &cases {
            if let Err(mismatch) = run_case(case) {
                panic!("{}: {mismatch}", path.display());
            }
        }
        total += cases.len();
    }
    println!("replayed {total} generated cases");
}
