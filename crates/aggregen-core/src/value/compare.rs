use crate::value::{Datum, Value, ValueError};
use std::cmp::Ordering;

impl Value {
    /// Three-valued comparison of two values of the same ordered type.
    ///
    /// Returns `Ok(None)` when either side is NULL.
    pub fn compare(&self, rhs: &Self) -> Result<Option<Ordering>, ValueError> {
        if self.sql_type != rhs.sql_type || !self.sql_type.supports_ordering() {
            return Err(ValueError::TypeMismatch {
                op: "compare",
                left: self.sql_type,
                right: rhs.sql_type,
            });
        }

        let (Some(lhs), Some(rhs_datum)) = (&self.datum, &rhs.datum) else {
            return Ok(None);
        };

        let ordering = match (lhs, rhs_datum) {
            (Datum::Bool(a), Datum::Bool(b)) => a.cmp(b),
            (Datum::Int(a), Datum::Int(b)) => a.cmp(b),
            (Datum::Decimal(a), Datum::Decimal(b)) => a.cmp(b),
            (Datum::Double(a), Datum::Double(b)) => a.cmp(b),
            (Datum::Text(a), Datum::Text(b)) => a.cmp(b),
            _ => {
                return Err(ValueError::TypeMismatch {
                    op: "compare",
                    left: self.sql_type,
                    right: rhs.sql_type,
                });
            }
        };

        Ok(Some(ordering))
    }
}
