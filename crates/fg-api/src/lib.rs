#![forbid(unsafe_code)]

use fg_core::ExecutionMode;
use fg_index::{Index, IndexArgs, IndexError, IndexOptions, IndexSource};
use fg_runtime::{EvidenceEntry, EvidenceKind, RuntimeContext};

/// Entry point that builds, checks and caches [`Index`] values while keeping
/// an evidence trail of every step.
#[derive(Debug, Clone)]
pub struct GeometricSession {
    runtime: RuntimeContext,
}

impl GeometricSession {
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        Self {
            runtime: RuntimeContext::new(mode),
        }
    }

    #[must_use]
    pub fn mode(&self) -> ExecutionMode {
        self.runtime.mode()
    }

    pub fn set_mode(&mut self, mode: ExecutionMode) {
        self.runtime.set_mode(mode);
    }

    pub fn index(
        &mut self,
        source: impl Into<IndexSource>,
        options: IndexOptions,
    ) -> Result<Index, IndexError> {
        let result = Index::new(source, options);
        self.record_construction(&result);
        result
    }

    pub fn index_from_call(
        &mut self,
        source: impl Into<IndexSource>,
        args: &IndexArgs,
    ) -> Result<Index, IndexError> {
        let result = Index::from_call(source, args);
        self.record_construction(&result);
        result
    }

    pub fn validate(&mut self, index: &mut Index) -> Result<(), IndexError> {
        match index.validate() {
            Ok(index) => {
                self.record_validated(index);
                Ok(())
            }
            Err(error) => {
                self.runtime
                    .record_rejection(EvidenceKind::Validation, "validate", &error);
                Err(error)
            }
        }
    }

    /// Fills the cache and reports whether one is present afterwards.
    pub fn fill_cache(&mut self, index: &mut Index) -> bool {
        let filled = index.fill_cache().indptr().is_some();
        let dim_size = format_dim_size(index.dim_size());
        self.runtime.ledger_mut().record_fields(
            EvidenceKind::Cache,
            if filled { "indptr present" } else { "indptr skipped" },
            &[
                ("len", &index.len()),
                ("dim_size", &dim_size),
                ("is_sorted", &index.is_sorted()),
            ],
        );
        filled
    }

    /// Constructs and validates data arriving from outside the session.
    ///
    /// Strict mode rejects any validation failure. Hardened mode withdraws a
    /// false sortedness claim or an inconsistent cache, records the repair as
    /// policy evidence, and validates again. Negative and out-of-range values
    /// are rejected in every mode.
    pub fn ingest(
        &mut self,
        source: impl Into<IndexSource>,
        options: IndexOptions,
    ) -> Result<Index, IndexError> {
        let mut index = self.index(source, options)?;
        loop {
            let error = match index.validate() {
                Ok(valid) => {
                    self.record_validated(valid);
                    return Ok(index);
                }
                Err(error) => error,
            };
            let repair = match (self.mode(), &error) {
                (ExecutionMode::Hardened, IndexError::NotSorted) => {
                    index.clear_sorted();
                    "sortedness claim withdrawn"
                }
                (ExecutionMode::Hardened, IndexError::InvalidCache { .. })
                    if index.indptr().is_some() =>
                {
                    index.clear_cache();
                    "inconsistent indptr dropped"
                }
                _ => {
                    self.runtime
                        .record_rejection(EvidenceKind::Validation, "ingest", &error);
                    return Err(error);
                }
            };
            self.runtime.ledger_mut().record_fields(
                EvidenceKind::Policy,
                repair,
                &[("mode", &"hardened"), ("cause", &error)],
            );
        }
    }

    #[must_use]
    pub fn evidence(&self) -> &[EvidenceEntry] {
        self.runtime.ledger().entries()
    }

    #[must_use]
    pub fn evidence_len(&self) -> usize {
        self.runtime.ledger().len()
    }

    fn record_construction(&mut self, result: &Result<Index, IndexError>) {
        match result {
            Ok(index) => {
                let dim_size = format_dim_size(index.dim_size());
                let layout = format!("0x{:016x}", index.as_tensor().meta().fingerprint64());
                self.runtime.ledger_mut().record_fields(
                    EvidenceKind::Construction,
                    "index constructed",
                    &[
                        ("len", &index.len()),
                        ("layout", &layout),
                        ("dtype", &index.dtype()),
                        ("device", &index.device()),
                        ("dim_size", &dim_size),
                        ("is_sorted", &index.is_sorted()),
                    ],
                );
            }
            Err(error) => {
                self.runtime
                    .record_rejection(EvidenceKind::Construction, "construction", error);
            }
        }
    }

    fn record_validated(&mut self, index: &Index) {
        let dim_size = format_dim_size(index.dim_size());
        self.runtime.ledger_mut().record_fields(
            EvidenceKind::Validation,
            "index validated",
            &[("len", &index.len()), ("dim_size", &dim_size)],
        );
    }
}

fn format_dim_size(dim_size: Option<usize>) -> String {
    dim_size.map_or_else(|| "unknown".to_string(), |size| size.to_string())
}

#[cfg(test)]
mod tests {
    use fg_core::{DType, Device, ExecutionMode};
    use fg_index::{IndexArgs, IndexError, IndexOptions};
    use fg_runtime::EvidenceKind;

    use super::GeometricSession;

    fn kinds(session: &GeometricSession) -> Vec<EvidenceKind> {
        session.evidence().iter().map(|entry| entry.kind).collect()
    }

    #[test]
    fn construction_validation_and_cache_record_evidence() {
        let mut session = GeometricSession::new(ExecutionMode::Strict);
        let mut index = session
            .index(
                vec![0i64, 1, 1, 2],
                IndexOptions::new().dtype(DType::I32).sorted(true),
            )
            .expect("index should construct");
        session.validate(&mut index).expect("index should validate");
        assert!(session.fill_cache(&mut index));

        assert_eq!(
            kinds(&session),
            vec![
                EvidenceKind::Policy,
                EvidenceKind::Construction,
                EvidenceKind::Validation,
                EvidenceKind::Cache,
            ]
        );
        let construction = &session.evidence()[1].summary;
        assert!(construction.contains("dtype=int32"), "{construction}");
        assert!(construction.contains("dim_size=unknown"), "{construction}");
        assert!(session.evidence()[3].summary.contains("dim_size=3"));
    }

    #[test]
    fn rejected_construction_is_recorded() {
        let mut session = GeometricSession::new(ExecutionMode::Strict);
        let err = session
            .index_from_call(vec![0i64], &IndexArgs::new().kwarg("pin_memory", true))
            .expect_err("unknown keyword");
        assert!(matches!(err, IndexError::InvalidKeywordArguments { .. }));
        let last = session.evidence().last().expect("evidence");
        assert_eq!(last.kind, EvidenceKind::Construction);
        assert!(last.summary.contains("construction rejected"));
    }

    #[test]
    fn unsorted_cache_fill_is_recorded_as_skipped() {
        let mut session = GeometricSession::new(ExecutionMode::Strict);
        let mut index = session
            .index(vec![1i64, 0], IndexOptions::new().dim_size(2))
            .expect("index");
        assert!(!session.fill_cache(&mut index));
        let last = session.evidence().last().expect("evidence");
        assert!(last.summary.starts_with("indptr skipped"));
    }

    #[test]
    fn strict_ingest_rejects_false_sortedness() {
        let mut session = GeometricSession::new(ExecutionMode::Strict);
        let err = session
            .ingest(vec![1i64, 0], IndexOptions::new().sorted(true))
            .expect_err("strict rejects unsorted data");
        assert_eq!(err, IndexError::NotSorted);
    }

    #[test]
    fn hardened_ingest_withdraws_false_sortedness() {
        let mut session = GeometricSession::new(ExecutionMode::Hardened);
        let index = session
            .ingest(
                vec![1i64, 0],
                IndexOptions::new().sorted(true).device(Device::Cuda),
            )
            .expect("hardened repairs sortedness claim");
        assert!(!index.is_sorted());
        assert_eq!(index.dim_size(), Some(2));

        let policy = session
            .evidence()
            .iter()
            .filter(|entry| entry.kind == EvidenceKind::Policy)
            .last()
            .expect("policy evidence");
        assert!(policy.summary.contains("sortedness claim withdrawn"));
        assert!(policy.summary.contains("mode=hardened"));
    }

    #[test]
    fn hardened_ingest_still_rejects_bad_values() {
        let mut session = GeometricSession::new(ExecutionMode::Hardened);
        assert!(matches!(
            session.ingest(vec![-1i64, 0], IndexOptions::new()),
            Err(IndexError::NegativeIndices { min: -1 })
        ));
        assert!(matches!(
            session.ingest(vec![0i64, 10], IndexOptions::new().dim_size(2)),
            Err(IndexError::ExceedsSize { .. })
        ));
    }

    #[test]
    fn mode_switch_is_supported() {
        let mut session = GeometricSession::new(ExecutionMode::Strict);
        session.set_mode(ExecutionMode::Hardened);
        assert_eq!(session.mode(), ExecutionMode::Hardened);
        assert_eq!(session.evidence_len(), 2);
    }
}
