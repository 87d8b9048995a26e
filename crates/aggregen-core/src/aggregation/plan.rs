use crate::{
    aggregation::{AggregateKind, AggregateSetupError, AggregateTerm, AggregationConfig, SlotKind},
    obs::sink::{self, MetricsEvent},
    storage::UpdateableStorage,
    types::SqlType,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// AggregateInfo
///
/// Descriptor of one physically stored aggregate value.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AggregateInfo {
    /// Per-slot operation; AVG terms show up as their SUM and COUNT parts.
    pub aggregate_type: SlotKind,
    /// Type of the stored value.
    pub sql_type: SqlType,
    /// Term whose input drives this slot's updates.
    pub source_index: usize,
    /// Placement key in the storage layout.
    pub storage_index: u32,
    /// True when no term returns this slot's value directly.
    pub is_internal: bool,
    /// Every term whose final value reads this slot, ascending.
    pub served_terms: Vec<usize>,
}

///
/// TermBinding
///
/// How one term's final value is produced from stored slots. Indices point
/// into `Aggregation::aggregate_infos`.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum TermBinding {
    Slot {
        slot: usize,
    },
    Average {
        sum: usize,
        count: usize,
        output_type: SqlType,
    },
}

///
/// Aggregation
///
/// Configured aggregate plan for one query. Immutable after `setup`; the
/// same instance drives initializer, update and finalize emission.
///

#[derive(Clone, Debug)]
pub struct Aggregation {
    pub(super) terms: Vec<AggregateTerm>,
    pub(super) infos: Vec<AggregateInfo>,
    pub(super) bindings: Vec<TermBinding>,
    pub(super) storage: UpdateableStorage,
    pub(super) is_global: bool,
    pub(super) config: AggregationConfig,
}

// Sharing identity: slot operation, input expression, stored type.
type SlotKey = (SlotKind, Option<String>, SqlType);

impl Aggregation {
    /// Plan the physical slots for `terms` and freeze their storage layout.
    pub fn setup(
        terms: Vec<AggregateTerm>,
        is_global: bool,
        config: AggregationConfig,
    ) -> Result<Self, AggregateSetupError> {
        match Planner::new(config).plan(&terms) {
            Ok(planned) => {
                let aggregation = Self {
                    terms,
                    infos: planned.infos,
                    bindings: planned.bindings,
                    storage: planned.storage,
                    is_global,
                    config,
                };
                sink::record(MetricsEvent::SetupFinish {
                    terms: aggregation.terms.len() as u64,
                    slots: aggregation.infos.len() as u64,
                    shared: planned.shared,
                    decomposed: planned.decomposed,
                    storage_bytes: aggregation.storage_size() as u64,
                });

                Ok(aggregation)
            }
            Err(err) => {
                sink::record(MetricsEvent::SetupRejected);
                Err(err)
            }
        }
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub fn terms(&self) -> &[AggregateTerm] {
        &self.terms
    }

    #[must_use]
    pub fn aggregate_infos(&self) -> &[AggregateInfo] {
        &self.infos
    }

    #[must_use]
    pub fn bindings(&self) -> &[TermBinding] {
        &self.bindings
    }

    #[must_use]
    pub const fn is_global(&self) -> bool {
        self.is_global
    }

    #[must_use]
    pub const fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Total size in bytes of one per-group aggregate buffer.
    #[must_use]
    pub const fn storage_size(&self) -> usize {
        self.storage.storage_size()
    }

    /// The frozen storage layout backing every emitted access.
    #[must_use]
    pub const fn storage(&self) -> &UpdateableStorage {
        &self.storage
    }

    /// Types of the finalized outputs, aligned to the terms.
    #[must_use]
    pub fn output_types(&self) -> Vec<SqlType> {
        self.bindings
            .iter()
            .map(|binding| match *binding {
                TermBinding::Slot { slot } => self.infos[slot].sql_type,
                TermBinding::Average { output_type, .. } => output_type,
            })
            .collect()
    }
}

struct Planned {
    infos: Vec<AggregateInfo>,
    bindings: Vec<TermBinding>,
    storage: UpdateableStorage,
    shared: u64,
    decomposed: u64,
}

///
/// Planner
///
/// Single-use builder behind `Aggregation::setup`.
///

struct Planner {
    config: AggregationConfig,
    infos: Vec<AggregateInfo>,
    storage: UpdateableStorage,
    by_key: BTreeMap<SlotKey, usize>,
    shared: u64,
}

impl Planner {
    fn new(config: AggregationConfig) -> Self {
        Self {
            config,
            infos: Vec::new(),
            storage: UpdateableStorage::new(),
            by_key: BTreeMap::new(),
            shared: 0,
        }
    }

    fn plan(mut self, terms: &[AggregateTerm]) -> Result<Planned, AggregateSetupError> {
        let mut bindings = Vec::with_capacity(terms.len());
        let mut decomposed = 0;

        for (index, term) in terms.iter().enumerate() {
            let input = validate_term(index, term)?;
            let expr = term.target.as_ref().map(|t| t.expr.clone());

            let binding = match term.kind {
                AggregateKind::CountStar => TermBinding::Slot {
                    slot: self.slot(SlotKind::CountStar, None, SqlType::BigInt, index, false)?,
                },
                AggregateKind::Count => TermBinding::Slot {
                    slot: self.slot(SlotKind::Count, expr, SqlType::BigInt, index, false)?,
                },
                AggregateKind::Sum => {
                    let ty = sum_type(index, term, input)?;
                    TermBinding::Slot {
                        slot: self.slot(SlotKind::Sum, expr, ty, index, false)?,
                    }
                }
                AggregateKind::Min => TermBinding::Slot {
                    slot: self.slot(SlotKind::Min, expr, input, index, false)?,
                },
                AggregateKind::Max => TermBinding::Slot {
                    slot: self.slot(SlotKind::Max, expr, input, index, false)?,
                },
                AggregateKind::Avg => {
                    let output_type = term.output_type.unwrap_or(self.config.avg_output_type);
                    if !output_type.is_numeric() {
                        return Err(AggregateSetupError::InvalidOutputType {
                            index,
                            kind: term.kind,
                            ty: output_type,
                        });
                    }
                    let sum_ty = sum_type(index, term, input)?;
                    decomposed += 1;

                    TermBinding::Average {
                        sum: self.slot(SlotKind::Sum, expr.clone(), sum_ty, index, true)?,
                        count: self.slot(SlotKind::Count, expr, SqlType::BigInt, index, true)?,
                        output_type,
                    }
                }
            };

            if let TermBinding::Slot { slot } = binding {
                let natural = self.infos[slot].sql_type;
                if let Some(declared) = term.output_type
                    && declared != natural
                {
                    return Err(AggregateSetupError::InvalidOutputType {
                        index,
                        kind: term.kind,
                        ty: declared,
                    });
                }
            }
            bindings.push(binding);
        }

        self.storage.finalize()?;
        let required = self.storage.storage_size();
        if required > self.config.max_storage_bytes {
            return Err(AggregateSetupError::StorageLimitExceeded {
                required,
                limit: self.config.max_storage_bytes,
            });
        }

        Ok(Planned {
            infos: self.infos,
            bindings,
            storage: self.storage,
            shared: self.shared,
            decomposed,
        })
    }

    // Find or allocate the slot for a (kind, expr, type) triple and record
    // that `term` reads it.
    fn slot(
        &mut self,
        kind: SlotKind,
        expr: Option<String>,
        sql_type: SqlType,
        term: usize,
        internal: bool,
    ) -> Result<usize, AggregateSetupError> {
        let key = (kind, expr, sql_type);

        if let Some(&slot) = self.by_key.get(&key) {
            let info = &mut self.infos[slot];
            if !info.served_terms.contains(&term) {
                info.served_terms.push(term);
            }
            if !internal {
                info.is_internal = false;
            }
            self.shared += 1;

            return Ok(slot);
        }

        let storage_index = if kind.is_counter() {
            self.storage.add_non_null_type(sql_type)?
        } else {
            self.storage.add_type(sql_type)?
        };
        let slot = self.infos.len();
        self.infos.push(AggregateInfo {
            aggregate_type: kind,
            sql_type,
            source_index: term,
            storage_index,
            is_internal: internal,
            served_terms: vec![term],
        });
        self.by_key.insert(key, slot);

        Ok(slot)
    }
}

// Check a term's shape and return the type it feeds per row.
fn validate_term(index: usize, term: &AggregateTerm) -> Result<SqlType, AggregateSetupError> {
    let kind = term.kind;

    if kind == AggregateKind::CountStar {
        if term.target.is_some() {
            return Err(AggregateSetupError::CountStarWithTarget { index });
        }
        if term.distinct {
            return Err(AggregateSetupError::DistinctUnsupported { index, kind });
        }
        return Ok(SqlType::BigInt);
    }

    let ty = term
        .target
        .as_ref()
        .map(|target| target.sql_type)
        .ok_or(AggregateSetupError::MissingTarget { index, kind })?;

    if term.distinct && !matches!(kind, AggregateKind::Min | AggregateKind::Max) {
        return Err(AggregateSetupError::DistinctUnsupported { index, kind });
    }

    match kind {
        AggregateKind::Sum | AggregateKind::Avg if !ty.supports_arithmetic() => {
            Err(AggregateSetupError::IncompatibleType { index, kind, ty })
        }
        AggregateKind::Min | AggregateKind::Max if !ty.supports_ordering() => {
            Err(AggregateSetupError::IncompatibleType { index, kind, ty })
        }
        AggregateKind::Min | AggregateKind::Max if ty.fixed_size().is_none() => {
            Err(AggregateSetupError::UnstorableType { index, kind, ty })
        }
        _ => Ok(ty),
    }
}

fn sum_type(
    index: usize,
    term: &AggregateTerm,
    input: SqlType,
) -> Result<SqlType, AggregateSetupError> {
    input.sum_type().ok_or(AggregateSetupError::IncompatibleType {
        index,
        kind: term.kind,
        ty: input,
    })
}
