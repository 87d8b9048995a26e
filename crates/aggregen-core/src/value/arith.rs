use crate::{
    types::{Decimal, Float64, SqlType},
    value::{Datum, Value, ValueError, int_bounds},
};

impl Value {
    /// Checked addition of two values of the same arithmetic type.
    ///
    /// NULL on either side yields NULL of the left type.
    pub fn checked_add(&self, rhs: &Self) -> Result<Self, ValueError> {
        let (lhs_datum, rhs_datum) = match self.arith_operands("add", rhs)? {
            Some(pair) => pair,
            None => return Ok(Self::null(self.sql_type)),
        };

        let datum = match (lhs_datum, rhs_datum) {
            (Datum::Int(a), Datum::Int(b)) => {
                let sum = a.checked_add(*b).ok_or(ValueError::Overflow {
                    op: "add",
                    ty: self.sql_type,
                })?;

                return Self::from_i64(self.sql_type, sum).map_err(|_| ValueError::Overflow {
                    op: "add",
                    ty: self.sql_type,
                });
            }
            (Datum::Decimal(a), Datum::Decimal(b)) => {
                Datum::Decimal(a.checked_add(*b).ok_or(ValueError::Overflow {
                    op: "add",
                    ty: self.sql_type,
                })?)
            }
            (Datum::Double(a), Datum::Double(b)) => {
                Datum::Double(Float64::try_new(a.get() + b.get()).ok_or(ValueError::Overflow {
                    op: "add",
                    ty: self.sql_type,
                })?)
            }
            _ => return Err(self.mismatch("add", rhs)),
        };

        Ok(Self::from_parts(self.sql_type, datum))
    }

    /// Checked division of two values of the same arithmetic type.
    ///
    /// Integer division truncates toward zero. NULL on either side yields NULL.
    pub fn checked_div(&self, rhs: &Self) -> Result<Self, ValueError> {
        let (lhs_datum, rhs_datum) = match self.arith_operands("div", rhs)? {
            Some(pair) => pair,
            None => return Ok(Self::null(self.sql_type)),
        };

        let datum = match (lhs_datum, rhs_datum) {
            (Datum::Int(_), Datum::Int(0)) => return Err(ValueError::DivisionByZero),
            (Datum::Int(a), Datum::Int(b)) => {
                let quotient = a.checked_div(*b).ok_or(ValueError::Overflow {
                    op: "div",
                    ty: self.sql_type,
                })?;

                return Self::from_i64(self.sql_type, quotient);
            }
            (Datum::Decimal(_), Datum::Decimal(b)) if b.is_zero() => {
                return Err(ValueError::DivisionByZero);
            }
            (Datum::Decimal(a), Datum::Decimal(b)) => {
                Datum::Decimal(a.checked_div(*b).ok_or(ValueError::Overflow {
                    op: "div",
                    ty: self.sql_type,
                })?)
            }
            (Datum::Double(_), Datum::Double(b)) if b.get() == 0.0 => {
                return Err(ValueError::DivisionByZero);
            }
            (Datum::Double(a), Datum::Double(b)) => {
                Datum::Double(Float64::try_new(a.get() / b.get()).ok_or(ValueError::Overflow {
                    op: "div",
                    ty: self.sql_type,
                })?)
            }
            _ => return Err(self.mismatch("div", rhs)),
        };

        Ok(Self::from_parts(self.sql_type, datum))
    }

    /// Cast to another type.
    ///
    /// Numeric types convert between each other (float and decimal to integer
    /// truncate). Every other type only casts to itself. NULL casts to NULL.
    pub fn cast(&self, to: SqlType) -> Result<Self, ValueError> {
        if self.sql_type == to {
            return Ok(self.clone());
        }
        if !(self.sql_type.is_numeric() && to.is_numeric()) {
            return Err(ValueError::TypeMismatch {
                op: "cast",
                left: self.sql_type,
                right: to,
            });
        }
        let Some(datum) = &self.datum else {
            return Ok(Self::null(to));
        };
        let overflow = || ValueError::Overflow { op: "cast", ty: to };

        match (datum, to) {
            (Datum::Int(v), SqlType::Decimal) => Ok(Self::decimal(Decimal::from_i64(*v))),
            #[expect(clippy::cast_precision_loss)]
            (Datum::Int(v), SqlType::Double) => {
                Self::try_double(*v as f64).ok_or_else(overflow)
            }
            (Datum::Int(v), _) => Self::from_i64(to, *v).map_err(|_| overflow()),
            (Datum::Decimal(v), SqlType::Double) => v
                .to_f64()
                .and_then(Self::try_double)
                .ok_or_else(overflow),
            (Datum::Decimal(v), _) => {
                let truncated = v.to_i64().ok_or_else(overflow)?;
                Self::from_i64(to, truncated).map_err(|_| overflow())
            }
            (Datum::Double(v), SqlType::Decimal) => Decimal::from_f64(v.get())
                .map(Self::decimal)
                .ok_or_else(overflow),
            (Datum::Double(v), _) => {
                let truncated = v.get().trunc();
                let (lo, hi) = int_bounds(to).ok_or_else(overflow)?;
                #[expect(clippy::cast_precision_loss)]
                let in_range = truncated >= lo as f64 && truncated <= hi as f64;
                if !in_range {
                    return Err(overflow());
                }
                #[expect(clippy::cast_possible_truncation)]
                let whole = truncated as i64;

                Self::from_i64(to, whole).map_err(|_| overflow())
            }
            (Datum::Bool(_) | Datum::Text(_), _) => Err(ValueError::TypeMismatch {
                op: "cast",
                left: self.sql_type,
                right: to,
            }),
        }
    }

    // Validate an arithmetic pair and split out the payloads; `None` when
    // either side is NULL.
    fn arith_operands<'a>(
        &'a self,
        op: &'static str,
        rhs: &'a Self,
    ) -> Result<Option<(&'a Datum, &'a Datum)>, ValueError> {
        if self.sql_type != rhs.sql_type || !self.sql_type.supports_arithmetic() {
            return Err(self.mismatch(op, rhs));
        }

        Ok(self.datum.as_ref().zip(rhs.datum.as_ref()))
    }

    const fn mismatch(&self, op: &'static str, rhs: &Self) -> ValueError {
        ValueError::TypeMismatch {
            op,
            left: self.sql_type,
            right: rhs.sql_type,
        }
    }
}
