#![forbid(unsafe_code)]

mod logging;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use fg_api::GeometricSession;
use fg_core::{DType, Device, ExecutionMode, RawData, Tensor};
use fg_index::{ArgValue, Index, IndexArgs, IndexError, IndexErrorKind, IndexOptions, IndexSource};
use fg_runtime::EvidenceEntry;
use serde::Deserialize;
use serde_json::{Value, json};

pub use logging::{STRUCTURED_LOG_SCHEMA_VERSION, StructuredCaseLog, mode_label};

const MAX_FIXTURE_BYTES: u64 = 1_048_576;
const INDEX_FIXTURE: &str = "index_cases.json";

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub fixture_root: PathBuf,
    pub strict_mode: bool,
}

impl HarnessConfig {
    #[must_use]
    pub fn default_paths() -> Self {
        Self {
            fixture_root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures"),
            strict_mode: true,
        }
    }

    #[must_use]
    pub fn default_mode(&self) -> ExecutionMode {
        if self.strict_mode {
            ExecutionMode::Strict
        } else {
            ExecutionMode::Hardened
        }
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self::default_paths()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessReport {
    pub suite: &'static str,
    pub fixture_count: usize,
    pub strict_mode: bool,
    pub cases_total: usize,
    pub cases_passed: usize,
}

impl HarnessReport {
    #[must_use]
    pub fn is_green(&self) -> bool {
        self.cases_total == self.cases_passed
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexCaseReport {
    pub name: String,
    pub op: String,
    pub mode: ExecutionMode,
    pub mismatches: Vec<String>,
    pub forensic_log: StructuredCaseLog,
}

impl IndexCaseReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct IndexFixtureFile {
    cases: Vec<IndexCase>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexCase {
    name: String,
    op: String,
    source: Option<String>,
    data: Value,
    dtype: Option<String>,
    device: Option<String>,
    dim_size: Option<usize>,
    is_sorted: Option<bool>,
    #[serde(default)]
    positional: Vec<Value>,
    #[serde(default)]
    keywords: BTreeMap<String, Value>,
    expected: IndexExpectation,
    hardened: Option<IndexExpectation>,
}

#[derive(Debug, Clone, Deserialize)]
struct IndexExpectation {
    ok: bool,
    error_kind: Option<String>,
    error_contains: Option<String>,
    dtype: Option<String>,
    device: Option<String>,
    dim_size: Option<usize>,
    is_sorted: Option<bool>,
    indptr: Option<Vec<i64>>,
    #[serde(default)]
    no_indptr: bool,
    repr: Option<String>,
}

pub fn run_index_conformance(
    config: &HarnessConfig,
    mode: ExecutionMode,
) -> Result<(HarnessReport, Vec<IndexCaseReport>), String> {
    let fixture_path = config.fixture_root.join(INDEX_FIXTURE);
    let fixture: IndexFixtureFile = load_fixture(&fixture_path)?;
    run_index_conformance_with_fixture(mode, &fixture)
}

fn run_index_conformance_with_fixture(
    mode: ExecutionMode,
    fixture: &IndexFixtureFile,
) -> Result<(HarnessReport, Vec<IndexCaseReport>), String> {
    let mut case_reports = Vec::with_capacity(fixture.cases.len());
    for case in &fixture.cases {
        case_reports.push(run_index_case(case, mode)?);
    }

    let (cases_total, cases_passed) =
        summarize_passes(case_reports.iter().map(IndexCaseReport::passed));

    let report = HarnessReport {
        suite: "index",
        fixture_count: 1,
        strict_mode: mode == ExecutionMode::Strict,
        cases_total,
        cases_passed,
    };

    Ok((report, case_reports))
}

fn run_index_case(case: &IndexCase, mode: ExecutionMode) -> Result<IndexCaseReport, String> {
    let mut session = GeometricSession::new(mode);
    let source = build_source(case)?;
    let options = build_options(case, &source)?;

    let outcome = match case.op.as_str() {
        "construct" => session.index(source, options),
        "call" => {
            let args = build_args(case)?;
            session.index_from_call(source, &args)
        }
        "validate" => session.index(source, options).and_then(|mut index| {
            session.validate(&mut index)?;
            Ok(index)
        }),
        "fill_cache" => session.index(source, options).and_then(|mut index| {
            session.validate(&mut index)?;
            session.fill_cache(&mut index);
            Ok(index)
        }),
        "ingest" => session.ingest(source, options),
        other => return Err(format!("unsupported op '{other}' in case '{}'", case.name)),
    };

    let expectation = match (mode, &case.hardened) {
        (ExecutionMode::Hardened, Some(hardened)) => hardened,
        _ => &case.expected,
    };
    let mismatches = compare_outcome(expectation, &outcome)?;
    let passed = mismatches.is_empty();
    let reason_code = if passed {
        "parity_ok"
    } else {
        "index_contract_mismatch"
    };

    let mut extra_fields = BTreeMap::new();
    extra_fields.insert("op".to_string(), json!(case.op));
    extra_fields.insert("data".to_string(), case.data.clone());
    extra_fields.insert("expected_ok".to_string(), json!(expectation.ok));
    extra_fields.insert("actual".to_string(), outcome_field(&outcome));
    extra_fields.insert("mismatches".to_string(), json!(mismatches));
    extra_fields.insert(
        "runtime_evidence".to_string(),
        runtime_evidence_field(session.evidence()),
    );

    Ok(IndexCaseReport {
        name: case.name.clone(),
        op: case.op.clone(),
        mode,
        forensic_log: StructuredCaseLog::new(
            "index",
            INDEX_FIXTURE,
            case.name.as_str(),
            mode,
            vec![format!("crates/fg-conformance/fixtures/{INDEX_FIXTURE}")],
            format!(
                "cargo run -p fg-conformance --bin run_index_conformance -- --mode {} --case {}",
                mode_label(mode),
                case.name
            ),
            if passed { "pass" } else { "fail" },
            reason_code,
        )
        .with_extra_fields(extra_fields),
        mismatches,
    })
}

fn build_source(case: &IndexCase) -> Result<IndexSource, String> {
    let raw = raw_from_json(&case.data)
        .map_err(|error| format!("case '{}' has unusable data: {error}", case.name))?;
    match case.source.as_deref().unwrap_or("raw") {
        "raw" => Ok(IndexSource::Raw(raw)),
        "tensor" => {
            let dtype = case.dtype.as_deref().map(parse_dtype).transpose()?;
            let device = case.device.as_deref().map(parse_device).transpose()?;
            Tensor::from_raw(&raw, dtype, device)
                .map(IndexSource::Tensor)
                .map_err(|error| format!("case '{}' tensor build failed: {error}", case.name))
        }
        other => Err(format!("unsupported source '{other}' in case '{}'", case.name)),
    }
}

fn build_options(case: &IndexCase, source: &IndexSource) -> Result<IndexOptions, String> {
    let mut options = IndexOptions::new();
    options.dim_size = case.dim_size;
    options.is_sorted = case.is_sorted;
    if source.is_raw() {
        options.dtype = case.dtype.as_deref().map(parse_dtype).transpose()?;
        options.device = case.device.as_deref().map(parse_device).transpose()?;
    }
    Ok(options)
}

fn build_args(case: &IndexCase) -> Result<IndexArgs, String> {
    let mut args = IndexArgs::new();
    for value in &case.positional {
        args = args.arg(arg_from_json(value)?);
    }
    for (name, value) in &case.keywords {
        args = args.kwarg(name.as_str(), arg_from_json(value)?);
    }
    Ok(args)
}

fn compare_outcome(
    expected: &IndexExpectation,
    outcome: &Result<Index, IndexError>,
) -> Result<Vec<String>, String> {
    let mut mismatches = Vec::new();
    let index = match (expected.ok, outcome) {
        (true, Ok(index)) => index,
        (false, Err(error)) => {
            if let Some(kind) = expected.error_kind.as_deref() {
                if kind_label(error.kind()) != kind {
                    mismatches.push(format!(
                        "error kind: expected {kind}, got {}",
                        kind_label(error.kind())
                    ));
                }
            }
            if let Some(fragment) = expected.error_contains.as_deref() {
                if !error.to_string().contains(fragment) {
                    mismatches.push(format!("error message lacks '{fragment}': {error}"));
                }
            }
            return Ok(mismatches);
        }
        (true, Err(error)) => {
            mismatches.push(format!("expected success, got error: {error}"));
            return Ok(mismatches);
        }
        (false, Ok(index)) => {
            mismatches.push(format!("expected an error, got {index}"));
            return Ok(mismatches);
        }
    };

    if let Some(dtype) = expected.dtype.as_deref() {
        if index.dtype() != parse_dtype(dtype)? {
            mismatches.push(format!("dtype: expected {dtype}, got {}", index.dtype()));
        }
    }
    if let Some(device) = expected.device.as_deref() {
        if index.device() != parse_device(device)? {
            mismatches.push(format!("device: expected {device}, got {}", index.device()));
        }
    }
    if expected.dim_size.is_some() && index.dim_size() != expected.dim_size {
        mismatches.push(format!(
            "dim_size: expected {:?}, got {:?}",
            expected.dim_size,
            index.dim_size()
        ));
    }
    if let Some(is_sorted) = expected.is_sorted {
        if index.is_sorted() != is_sorted {
            mismatches.push(format!(
                "is_sorted: expected {is_sorted}, got {}",
                index.is_sorted()
            ));
        }
    }
    let actual_indptr = index
        .indptr()
        .map(Tensor::to_int_vec)
        .transpose()
        .map_err(|error| format!("indptr unreadable: {error}"))?;
    if let Some(indptr) = &expected.indptr {
        if actual_indptr.as_ref() != Some(indptr) {
            mismatches.push(format!(
                "indptr: expected {indptr:?}, got {actual_indptr:?}"
            ));
        }
        if index.indptr().map(Tensor::dtype) != Some(index.dtype()) {
            mismatches.push("indptr dtype differs from data".to_string());
        }
    }
    if expected.no_indptr && actual_indptr.is_some() {
        mismatches.push(format!("indptr: expected none, got {actual_indptr:?}"));
    }
    if let Some(repr) = expected.repr.as_deref() {
        let actual = index.to_string();
        if actual != repr {
            mismatches.push(format!("repr: expected {repr}, got {actual}"));
        }
    }
    Ok(mismatches)
}

fn outcome_field(outcome: &Result<Index, IndexError>) -> Value {
    match outcome {
        Ok(index) => json!({
            "ok": true,
            "repr": index.to_string(),
            "indptr": index.indptr().and_then(|indptr| indptr.to_int_vec().ok()),
        }),
        Err(error) => json!({
            "ok": false,
            "error_kind": kind_label(error.kind()),
            "error": error.to_string(),
        }),
    }
}

fn runtime_evidence_field(entries: &[EvidenceEntry]) -> Value {
    let mut kind_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for entry in entries {
        *kind_counts.entry(entry.kind.label()).or_insert(0) += 1;
    }

    json!({
        "total_entries": entries.len(),
        "kind_counts": kind_counts,
        "entries": entries
            .iter()
            .map(|entry| {
                json!({
                    "ts_unix_ms": entry.ts_unix_ms,
                    "kind": entry.kind.label(),
                    "summary": entry.summary,
                })
            })
            .collect::<Vec<_>>(),
    })
}

fn kind_label(kind: IndexErrorKind) -> &'static str {
    match kind {
        IndexErrorKind::Type => "type",
        IndexErrorKind::Shape => "shape",
        IndexErrorKind::Argument => "argument",
        IndexErrorKind::Value => "value",
    }
}

fn raw_from_json(value: &Value) -> Result<RawData, String> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(RawData::Int)
            .or_else(|| number.as_f64().map(RawData::Float))
            .ok_or_else(|| format!("number {number} is not representable")),
        Value::Array(items) => items
            .iter()
            .map(raw_from_json)
            .collect::<Result<Vec<_>, _>>()
            .map(RawData::List),
        other => Err(format!("expected a number or a list, got {other}")),
    }
}

fn arg_from_json(value: &Value) -> Result<ArgValue, String> {
    match value {
        Value::Null => Ok(ArgValue::None),
        Value::Bool(flag) => Ok(ArgValue::Bool(*flag)),
        Value::Number(number) => number
            .as_i64()
            .map(ArgValue::Int)
            .ok_or_else(|| format!("argument {number} is not an integer")),
        Value::String(text) => parse_dtype(text)
            .map(ArgValue::DType)
            .or_else(|_| parse_device(text).map(ArgValue::Device)),
        other => Err(format!("unsupported argument value {other}")),
    }
}

fn parse_dtype(name: &str) -> Result<DType, String> {
    [DType::F32, DType::F64, DType::I32, DType::I64]
        .into_iter()
        .find(|dtype| dtype.name() == name)
        .ok_or_else(|| format!("unknown dtype '{name}'"))
}

fn parse_device(name: &str) -> Result<Device, String> {
    [Device::Cpu, Device::Cuda]
        .into_iter()
        .find(|device| device.name() == name)
        .ok_or_else(|| format!("unknown device '{name}'"))
}

fn load_fixture<T>(path: &Path) -> Result<T, String>
where
    T: for<'de> Deserialize<'de>,
{
    let metadata = fs::metadata(path).map_err(|error| {
        format!(
            "failed reading fixture metadata {}: {error}",
            path.display()
        )
    })?;
    let size = metadata.len();
    if size > MAX_FIXTURE_BYTES {
        return Err(format!(
            "fixture {} exceeds max bytes: actual={size} max={MAX_FIXTURE_BYTES}",
            path.display()
        ));
    }

    let raw = fs::read_to_string(path)
        .map_err(|error| format!("failed reading fixture {}: {error}", path.display()))?;
    serde_json::from_str::<T>(&raw)
        .map_err(|error| format!("failed parsing fixture {}: {error}", path.display()))
}

fn summarize_passes<I>(iter: I) -> (usize, usize)
where
    I: Iterator<Item = bool>,
{
    let mut total = 0usize;
    let mut passed = 0usize;
    for is_passed in iter {
        total += 1;
        if is_passed {
            passed += 1;
        }
    }
    (total, passed)
}
