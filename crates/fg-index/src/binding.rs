use fg_core::{DType, Device};

use crate::error::IndexError;
use crate::index::{Index, IndexOptions, IndexSource};

const KEYWORDS: [&str; 4] = ["dtype", "device", "dim_size", "is_sorted"];
const FACTORY_KEYWORDS: [&str; 2] = ["dtype", "device"];

/// Dynamically typed call argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgValue {
    None,
    Bool(bool),
    Int(i64),
    DType(DType),
    Device(Device),
}

impl ArgValue {
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::DType(_) => "dtype",
            Self::Device(_) => "device",
        }
    }
}

impl From<bool> for ArgValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<DType> for ArgValue {
    fn from(value: DType) -> Self {
        Self::DType(value)
    }
}

impl From<Device> for ArgValue {
    fn from(value: Device) -> Self {
        Self::Device(value)
    }
}

/// Positional and keyword arguments of a dynamic `Index(...)` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexArgs {
    positional: Vec<ArgValue>,
    keywords: Vec<(String, ArgValue)>,
}

impl IndexArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn arg(mut self, value: impl Into<ArgValue>) -> Self {
        self.positional.push(value.into());
        self
    }

    #[must_use]
    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.keywords.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn positional(&self) -> &[ArgValue] {
        &self.positional
    }

    #[must_use]
    pub fn keywords(&self) -> &[(String, ArgValue)] {
        &self.keywords
    }

    fn keyword(&self, name: &str) -> Option<ArgValue> {
        self.keywords
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value)
    }

    fn signature(&self, source: &IndexSource) -> Vec<String> {
        let mut got = vec![source.type_name().to_string()];
        got.extend(
            self.positional
                .iter()
                .map(|value| value.type_name().to_string()),
        );
        got.extend(
            self.keywords
                .iter()
                .map(|(name, value)| format!("{name}={}", value.type_name())),
        );
        got
    }
}

impl Index {
    /// Builds an `Index` from a dynamically typed call.
    ///
    /// A single positional argument is accepted only as the dtype of a raw
    /// source. Tensor and `Index` sources take no positional arguments and
    /// no `dtype`/`device` keywords.
    pub fn from_call(source: impl Into<IndexSource>, args: &IndexArgs) -> Result<Self, IndexError> {
        let source = source.into();
        let options = bind(&source, args)?;
        Self::new(source, options)
    }
}

fn bind(source: &IndexSource, args: &IndexArgs) -> Result<IndexOptions, IndexError> {
    let combination = || IndexError::InvalidCombination {
        got: args.signature(source),
    };

    let mut seen: Vec<&str> = Vec::with_capacity(args.keywords.len());
    for (name, _) in &args.keywords {
        if seen.contains(&name.as_str()) {
            return Err(combination());
        }
        seen.push(name);
    }

    let positional_dtype = match args.positional.as_slice() {
        [] => None,
        [ArgValue::DType(dtype)] if source.is_raw() && args.keyword("dtype").is_none() => {
            Some(*dtype)
        }
        _ => return Err(combination()),
    };

    let rejected: Vec<String> = args
        .keywords
        .iter()
        .map(|(name, _)| name)
        .filter(|name| {
            !KEYWORDS.contains(&name.as_str())
                || (!source.is_raw() && FACTORY_KEYWORDS.contains(&name.as_str()))
        })
        .cloned()
        .collect();
    if !rejected.is_empty() {
        return Err(IndexError::InvalidKeywordArguments { names: rejected });
    }

    let mut options = IndexOptions::new();
    options.dtype = positional_dtype;
    for (name, value) in &args.keywords {
        match (name.as_str(), *value) {
            (_, ArgValue::None) => {}
            ("dtype", ArgValue::DType(dtype)) => options.dtype = Some(dtype),
            ("device", ArgValue::Device(device)) => options.device = Some(device),
            ("dim_size", ArgValue::Int(size)) => {
                options.dim_size = Some(usize::try_from(size).map_err(|_| combination())?);
            }
            ("is_sorted", ArgValue::Bool(flag)) => options.is_sorted = Some(flag),
            _ => return Err(combination()),
        }
    }
    Ok(options)
}
