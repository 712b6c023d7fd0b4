//! Canned provider payloads and downloader scripts
//!
//! Scripts receive the deemix argument vector
//! `--portable -b <quality> -p <out> <url>`, so `$5` is the output dir.

/// Deezer search page with a single result
pub fn search_page() -> serde_json::Value {
    serde_json::json!({
        "data": [{
            "id": 3135556,
            "title": "Harder, Better, Faster, Stronger",
            "duration": 224,
            "artist": {"name": "Daft Punk"},
            "album": {"title": "Discovery"}
        }],
        "total": 1
    })
}

/// Writes a partial file, then renames it into place and exits
pub const PRODUCES_FLAC: &str = r#"
[ "$(cat config/.arl)" = "test-arl" ] || { echo "arl missing from workspace" >&2; exit 9; }
printf 'fLaC partial' > "$5/Daft Punk - Harder.flac.part"
sleep 0.3
printf 'fLaC audio payload' > "$5/Daft Punk - Harder.flac.part"
mv "$5/Daft Punk - Harder.flac.part" "$5/Daft Punk - Harder.flac"
"#;

/// Never finishes
pub const HANGS: &str = "exec sleep 30";

/// Fails with a diagnostic on stderr
pub const FAILS: &str = r#"
echo "resolving track" >&2
echo "Track not yet available in your country" >&2
exit 1
"#;

/// Exits cleanly without producing anything
pub const PRODUCES_NOTHING: &str = "exit 0";

/// Writes the file but keeps running afterwards
pub const LINGERS: &str = r#"
printf 'ID3 audio' > "$5/Daft Punk - Harder.mp3"
exec sleep 30
"#;

/// Writes straight into the final name in two chunks with a stall between
pub const WRITES_IN_TWO_CHUNKS: &str = r#"
printf 'fLaC first chunk ' > "$5/Daft Punk - Harder.flac"
sleep 3
printf 'second chunk' >> "$5/Daft Punk - Harder.flac"
exit 0
"#;

/// Keeps writing partial chunks into the workspace until killed
pub const KEEPS_WRITING: &str = r#"
i=0
while :; do
  i=$((i+1))
  printf 'partial' > "$5/chunk$i.part"
  sleep 0.01
done
"#;
