use crate::{
    aggregation::{Aggregation, SlotKind, TermBinding},
    storage::LayoutError,
    types::SqlType,
};
use serde::{Deserialize, Serialize};

///
/// AggregationExplain
///
/// Serializable view of a configured aggregation: what each term reads
/// and where each slot lives in the buffer.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct AggregationExplain {
    pub is_global: bool,
    pub storage_size: usize,
    pub terms: Vec<TermExplain>,
    pub slots: Vec<SlotExplain>,
}

///
/// TermExplain
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct TermExplain {
    pub index: usize,
    pub term: String,
    pub output_type: SqlType,
    pub binding: TermBinding,
}

///
/// SlotExplain
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SlotExplain {
    pub slot: usize,
    pub kind: SlotKind,
    pub sql_type: SqlType,
    pub source_index: usize,
    pub offset: usize,
    pub internal: bool,
    pub served_terms: Vec<usize>,
}

impl Aggregation {
    /// Describe the plan and its frozen layout.
    pub fn explain(&self) -> Result<AggregationExplain, LayoutError> {
        let output_types = self.output_types();

        let terms = self
            .terms
            .iter()
            .zip(&self.bindings)
            .zip(output_types)
            .enumerate()
            .map(|(index, ((term, binding), output_type))| TermExplain {
                index,
                term: term.to_string(),
                output_type,
                binding: *binding,
            })
            .collect();

        let slots = self
            .infos
            .iter()
            .enumerate()
            .map(|(slot, info)| {
                let layout = self.storage.slot(info.storage_index)?;

                Ok(SlotExplain {
                    slot,
                    kind: info.aggregate_type,
                    sql_type: info.sql_type,
                    source_index: info.source_index,
                    offset: layout.offset,
                    internal: info.is_internal,
                    served_terms: info.served_terms.clone(),
                })
            })
            .collect::<Result<_, LayoutError>>()?;

        Ok(AggregationExplain {
            is_global: self.is_global,
            storage_size: self.storage_size(),
            terms,
            slots,
        })
    }
}
