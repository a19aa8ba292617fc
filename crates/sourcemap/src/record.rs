use crate::vlq::decode_segment;
use crate::{Result, SourceMapError};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Some servers prefix maps with this line to defeat JSON hijacking.
const XSSI_PREFIX: &str = ")]}'";
/// Upper bound on the generated line table, including section offsets.
const MAX_GENERATED_LINES: usize = 1 << 20;

/// One decoded mapping segment. Everything is 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Mapping {
    generated_column: u32,
    original: Option<OriginalRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OriginalRef {
    source: u32,
    line: u32,
    column: u32,
    name: Option<u32>,
}

/// Which of the candidate queries produced a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    ExactCoordinates,
    FirstLine,
    DeclaredSource,
}

impl QueryKind {
    pub fn describe(self) -> &'static str {
        match self {
            Self::ExactCoordinates => "exact generated coordinates",
            Self::FirstLine => "first generated line",
            Self::DeclaredSource => "declared source",
        }
    }
}

/// A generated-position query. `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneratedQuery<'a> {
    pub source: &'a str,
    pub line: u32,
    pub column: u32,
}

/// Result of a successful lookup. `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub name: Option<String>,
    pub map_path: PathBuf,
    pub matched_by: QueryKind,
}

/// A parsed `.map` artifact.
#[derive(Debug, Clone)]
pub struct SourceMapRecord {
    path: PathBuf,
    file: Option<String>,
    sources: Vec<String>,
    names: Vec<String>,
    lines: Vec<Vec<Mapping>>,
}

impl SourceMapRecord {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::parse(path, &content)
    }

    pub fn parse(path: impl Into<PathBuf>, content: &str) -> Result<Self> {
        let path = path.into();
        let content = content.trim_start_matches('\u{feff}');
        let content = match content.strip_prefix(XSSI_PREFIX) {
            Some(rest) => rest.split_once('\n').map_or("", |(_, body)| body),
            None => content,
        };

        let raw: RawSourceMap =
            serde_json::from_str(content).map_err(|err| SourceMapError::MapParse {
                path: path.clone(),
                reason: err.to_string(),
            })?;

        let mut table = TableBuilder::default();
        table.append(&raw, 0, 0)?;
        table.finish();

        Ok(Self {
            path,
            file: raw.file.filter(|f| !f.is_empty()),
            sources: table.sources,
            names: table.names,
            lines: table.lines,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The generated file this map describes, when declared.
    pub fn file(&self) -> Option<&str> {
        self.file.as_deref()
    }

    /// Declared original sources, `sourceRoot` applied.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn mapping_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// Greatest-lower-bound lookup on the generated line: the mapping with the
    /// largest generated column not after `column`. Both inputs are 1-based.
    pub fn original_position_for(&self, line: u32, column: u32) -> Option<OriginalPosition> {
        let line_index = usize::try_from(line.checked_sub(1)?).ok()?;
        let column = column.saturating_sub(1);
        let segments = self.lines.get(line_index)?;

        let mut index = segments.partition_point(|m| m.generated_column <= column);
        if index == 0 {
            return None;
        }
        index -= 1;
        let found_column = segments[index].generated_column;
        while index > 0 && segments[index - 1].generated_column == found_column {
            index -= 1;
        }

        let original = segments[index].original?;
        let source = self.sources.get(original.source as usize)?;
        if source.is_empty() {
            return None;
        }
        Some(OriginalPosition {
            source: source.clone(),
            line: original.line + 1,
            column: original.column + 1,
            name: original
                .name
                .and_then(|idx| self.names.get(idx as usize))
                .cloned(),
            map_path: self.path.clone(),
            matched_by: QueryKind::ExactCoordinates,
        })
    }

    /// Run one candidate query. Queries without a source are skipped.
    pub fn query(&self, query: GeneratedQuery<'_>, kind: QueryKind) -> Option<OriginalPosition> {
        if query.source.trim().is_empty() {
            return None;
        }
        let mut position = self.original_position_for(query.line, query.column)?;
        position.matched_by = kind;
        Some(position)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u32,
    #[serde(default)]
    file: Option<String>,
    #[serde(default)]
    source_root: Option<String>,
    #[serde(default)]
    sources: Vec<Option<String>>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    mappings: Option<String>,
    #[serde(default)]
    sections: Option<Vec<RawSection>>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    offset: RawOffset,
    #[serde(default)]
    map: Option<Box<RawSourceMap>>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOffset {
    line: u32,
    column: u32,
}

#[derive(Default)]
struct TableBuilder {
    sources: Vec<String>,
    names: Vec<String>,
    lines: Vec<Vec<Mapping>>,
}

impl TableBuilder {
    fn append(&mut self, raw: &RawSourceMap, line_offset: u32, column_offset: u32) -> Result<()> {
        if raw.version != 3 {
            return Err(SourceMapError::UnsupportedVersion(raw.version));
        }

        if let Some(sections) = &raw.sections {
            for section in sections {
                if let Some(url) = &section.url {
                    return Err(SourceMapError::InvalidMappings(format!(
                        "section references external map {url}"
                    )));
                }
                let map = section.map.as_deref().ok_or_else(|| {
                    SourceMapError::InvalidMappings("section without map".to_string())
                })?;
                if map.sections.is_some() {
                    return Err(SourceMapError::InvalidMappings(
                        "nested sections are not allowed".to_string(),
                    ));
                }
                let line = line_offset
                    .checked_add(section.offset.line)
                    .filter(|line| (*line as usize) < MAX_GENERATED_LINES)
                    .ok_or_else(|| {
                        SourceMapError::InvalidMappings(format!(
                            "section line offset {} out of range",
                            section.offset.line
                        ))
                    })?;
                let column = column_offset
                    .checked_add(section.offset.column)
                    .ok_or_else(|| {
                        SourceMapError::InvalidMappings(format!(
                            "section column offset {} out of range",
                            section.offset.column
                        ))
                    })?;
                self.append(map, line, column)?;
            }
            return Ok(());
        }

        let mappings = raw
            .mappings
            .as_deref()
            .ok_or_else(|| SourceMapError::InvalidMappings("missing mappings".to_string()))?;

        let source_base = self.sources.len();
        let name_base = self.names.len();
        let source_root = raw.source_root.as_deref().unwrap_or_default();
        self.sources.extend(
            raw.sources
                .iter()
                .map(|source| apply_source_root(source_root, source.as_deref().unwrap_or_default())),
        );
        self.names.extend(raw.names.iter().cloned());

        self.decode(
            mappings,
            &DecodeContext {
                line_offset,
                column_offset,
                source_base,
                source_count: raw.sources.len(),
                name_base,
                name_count: raw.names.len(),
            },
        )
    }

    fn decode(&mut self, mappings: &str, ctx: &DecodeContext) -> Result<()> {
        let mut fields = Vec::with_capacity(5);
        let mut source: i64 = 0;
        let mut original_line: i64 = 0;
        let mut original_column: i64 = 0;
        let mut name: i64 = 0;

        for (line_index, line) in mappings.split(';').enumerate() {
            let generated_line = ctx.line_offset as usize + line_index;
            if generated_line >= MAX_GENERATED_LINES {
                return Err(SourceMapError::InvalidMappings(format!(
                    "generated line {generated_line} exceeds {MAX_GENERATED_LINES}"
                )));
            }
            let column_shift = if line_index == 0 { ctx.column_offset } else { 0 };
            let mut generated_column: i64 = 0;

            for segment in line.split(',').filter(|s| !s.is_empty()) {
                decode_segment(segment, &mut fields)?;
                if !matches!(fields.len(), 1 | 4 | 5) {
                    return Err(SourceMapError::InvalidMappings(format!(
                        "segment {segment:?} has {} fields",
                        fields.len()
                    )));
                }

                generated_column += fields[0];
                let column = non_negative(generated_column, "generated column")?
                    .checked_add(column_shift)
                    .ok_or_else(|| {
                        SourceMapError::InvalidMappings("generated column overflows".to_string())
                    })?;

                let original = if fields.len() >= 4 {
                    source += fields[1];
                    original_line += fields[2];
                    original_column += fields[3];
                    let source_index = bounded(source, ctx.source_count, "source index")?;
                    let name_index = if fields.len() == 5 {
                        name += fields[4];
                        Some(bounded(name, ctx.name_count, "name index")? + ctx.name_base as u32)
                    } else {
                        None
                    };
                    Some(OriginalRef {
                        source: source_index + ctx.source_base as u32,
                        line: non_negative(original_line, "original line")?,
                        column: non_negative(original_column, "original column")?,
                        name: name_index,
                    })
                } else {
                    None
                };

                if self.lines.len() <= generated_line {
                    self.lines.resize_with(generated_line + 1, Vec::new);
                }
                self.lines[generated_line].push(Mapping {
                    generated_column: column,
                    original,
                });
            }
        }
        Ok(())
    }

    fn finish(&mut self) {
        for line in &mut self.lines {
            line.sort_by_key(|m| m.generated_column);
        }
    }
}

struct DecodeContext {
    line_offset: u32,
    column_offset: u32,
    source_base: usize,
    source_count: usize,
    name_base: usize,
    name_count: usize,
}

fn non_negative(value: i64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| SourceMapError::InvalidMappings(format!("{what} out of range: {value}")))
}

fn bounded(value: i64, len: usize, what: &str) -> Result<u32> {
    let index = non_negative(value, what)?;
    if index as usize >= len {
        return Err(SourceMapError::InvalidMappings(format!(
            "{what} {index} out of range (len {len})"
        )));
    }
    Ok(index)
}

fn apply_source_root(root: &str, source: &str) -> String {
    if root.is_empty() || source.is_empty() || source.starts_with('/') || source.contains("://") {
        return source.to_string();
    }
    if root.ends_with('/') {
        format!("{root}{source}")
    } else {
        format!("{root}/{source}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vlq::encode_vlq;
    use pretty_assertions::assert_eq;

    /// Encode absolute `(gen_line, gen_col, source, orig_line, orig_col)` tuples
    /// (all 0-based, sorted by generated position) into a `mappings` string.
    fn encode(entries: &[(u32, u32, u32, u32, u32)]) -> String {
        let mut out = String::new();
        let mut line = 0;
        let mut prev = (0i64, 0i64, 0i64, 0i64);
        let mut first_in_line = true;
        for &(gl, gc, src, ol, oc) in entries {
            while line < gl {
                out.push(';');
                line += 1;
                prev.0 = 0;
                first_in_line = true;
            }
            if !first_in_line {
                out.push(',');
            }
            first_in_line = false;
            encode_vlq(i64::from(gc) - prev.0, &mut out);
            encode_vlq(i64::from(src) - prev.1, &mut out);
            encode_vlq(i64::from(ol) - prev.2, &mut out);
            encode_vlq(i64::from(oc) - prev.3, &mut out);
            prev = (i64::from(gc), i64::from(src), i64::from(ol), i64::from(oc));
        }
        out
    }

    fn map_json(mappings: &str) -> String {
        format!(
            r#"{{"version":3,"file":"app.js","sourceRoot":"","sources":["src/Form.tsx","src/App.tsx"],"names":["Form"],"mappings":"{mappings}"}}"#
        )
    }

    #[test]
    fn greatest_lower_bound_on_same_line() {
        let mappings = encode(&[(0, 0, 1, 0, 0), (39, 2, 0, 21, 4), (39, 10, 0, 30, 0)]);
        let record = SourceMapRecord::parse("app.js.map", &map_json(&mappings)).unwrap();

        assert_eq!(record.file(), Some("app.js"));
        assert_eq!(record.mapping_count(), 3);

        let exact = record.original_position_for(40, 3).unwrap();
        assert_eq!(exact.source, "src/Form.tsx");
        assert_eq!((exact.line, exact.column), (22, 5));

        let between = record.original_position_for(40, 9).unwrap();
        assert_eq!((between.line, between.column), (22, 5));

        let after = record.original_position_for(40, 200).unwrap();
        assert_eq!(after.line, 31);

        assert!(record.original_position_for(40, 2).is_none());
        assert!(record.original_position_for(2, 1).is_none());
        assert!(record.original_position_for(0, 1).is_none());
        assert!(record.original_position_for(900, 1).is_none());
    }

    #[test]
    fn names_and_source_root_are_applied() {
        let json = r#"{"version":3,"sourceRoot":"webpack:///./","sources":["a.js",null],"names":["x","y"],"mappings":"AAAAC"}"#;
        let record = SourceMapRecord::parse("a.js.map", json).unwrap();
        assert_eq!(record.sources(), &["webpack:///./a.js".to_string(), String::new()]);

        let hit = record.original_position_for(1, 1).unwrap();
        assert_eq!(hit.name.as_deref(), Some("y"));
        assert_eq!(hit.source, "webpack:///./a.js");
    }

    #[test]
    fn query_requires_a_source() {
        let record = SourceMapRecord::parse("m.map", &map_json("AAAA")).unwrap();
        let query = GeneratedQuery {
            source: "",
            line: 1,
            column: 1,
        };
        assert!(record.query(query, QueryKind::FirstLine).is_none());

        let query = GeneratedQuery {
            source: "app.js",
            ..query
        };
        let hit = record.query(query, QueryKind::FirstLine).unwrap();
        assert_eq!(hit.matched_by, QueryKind::FirstLine);
    }

    #[test]
    fn unmapped_segments_do_not_resolve() {
        let record = SourceMapRecord::parse("m.map", &map_json("A")).unwrap();
        assert!(record.original_position_for(1, 1).is_none());
    }

    #[test]
    fn indexed_maps_are_flattened_with_offsets() {
        let json = r#"{
            "version": 3,
            "sections": [
                {"offset": {"line": 0, "column": 0},
                 "map": {"version":3,"sources":["one.ts"],"names":[],"mappings":"AAAA"}},
                {"offset": {"line": 10, "column": 4},
                 "map": {"version":3,"sources":["two.ts"],"names":[],"mappings":"AACA"}}
            ]
        }"#;
        let record = SourceMapRecord::parse("bundle.js.map", json).unwrap();
        assert_eq!(record.sources(), &["one.ts".to_string(), "two.ts".to_string()]);

        let hit = record.original_position_for(11, 5).unwrap();
        assert_eq!(hit.source, "two.ts");
        assert_eq!(hit.line, 2);
        assert!(record.original_position_for(11, 4).is_none());
    }

    #[test]
    fn xssi_prefix_is_stripped() {
        let json = format!(")]}}'\n{}", map_json("AAAA"));
        assert!(SourceMapRecord::parse("m.map", &json).is_ok());
    }

    #[test]
    fn malformed_maps_are_rejected() {
        assert!(matches!(
            SourceMapRecord::parse("m.map", "not json"),
            Err(SourceMapError::MapParse { .. })
        ));
        assert!(matches!(
            SourceMapRecord::parse("m.map", r#"{"version":2,"sources":[],"mappings":""}"#),
            Err(SourceMapError::UnsupportedVersion(2))
        ));
        assert!(matches!(
            SourceMapRecord::parse("m.map", r#"{"version":3,"sources":["a"],"mappings":"AAAAA"}"#),
            Err(SourceMapError::InvalidMappings(_))
        ));
        assert!(matches!(
            SourceMapRecord::parse("m.map", r#"{"version":3,"sources":["a"],"mappings":"ACAA"}"#),
            Err(SourceMapError::InvalidMappings(_))
        ));
        assert!(matches!(
            SourceMapRecord::parse("m.map", r#"{"version":3,"sources":["a"],"mappings":"AA"}"#),
            Err(SourceMapError::InvalidMappings(_))
        ));
    }

    #[test]
    fn section_offsets_are_bounded() {
        let nested = r#"{"version":3,"sections":[
            {"offset":{"line":3000000000,"column":0},"map":{"version":3,"sections":[
                {"offset":{"line":3000000000,"column":0},
                 "map":{"version":3,"sources":["a"],"names":[],"mappings":"AAAA"}}]}}]}"#;
        assert!(matches!(
            SourceMapRecord::parse("m.map", nested),
            Err(SourceMapError::InvalidMappings(_))
        ));

        let far = r#"{"version":3,"sections":[
            {"offset":{"line":4000000000,"column":0},
             "map":{"version":3,"sources":["a"],"names":[],"mappings":"AAAA"}}]}"#;
        assert!(matches!(
            SourceMapRecord::parse("m.map", far),
            Err(SourceMapError::InvalidMappings(_))
        ));

        let wide = r#"{"version":3,"sections":[
            {"offset":{"line":0,"column":4294967295},
             "map":{"version":3,"sources":["a"],"names":[],"mappings":"CAAA"}}]}"#;
        assert!(matches!(
            SourceMapRecord::parse("m.map", wide),
            Err(SourceMapError::InvalidMappings(_))
        ));
    }
}
