//! The fixed applicant feature schema.
//!
//! The model consumes exactly ten numeric features in a fixed order that
//! must match the training-time column order. Rather than trusting callers
//! to assemble a positional array, inference input is a struct with named
//! fields: mandatory fields are plain `f32`, and the two columns that may
//! legitimately be absent (monthly income, number of dependents) are
//! `Option<f32>` and filled from the training-time medians.

/// Number of input features.
pub const N_FEATURES: usize = 10;

/// Canonical feature column names, in training order.
///
/// These match the source dataset's column headers. [`Dataset`] validation
/// requires every one of them to be present.
///
/// [`Dataset`]: crate::data::Dataset
pub const FEATURE_NAMES: [&str; N_FEATURES] = [
    "RevolvingUtilizationOfUnsecuredLines",
    "age",
    "NumberOfTime30-59DaysPastDueNotWorse",
    "DebtRatio",
    "MonthlyIncome",
    "NumberOfOpenCreditLinesAndLoans",
    "NumberOfTimes90DaysLate",
    "NumberRealEstateLoansOrLines",
    "NumberOfTime60-89DaysPastDueNotWorse",
    "NumberOfDependents",
];

/// Label column name (serious delinquency within two years, 0/1).
pub const LABEL_NAME: &str = "SeriousDlqin2yrs";

/// Column index of `MonthlyIncome` in [`FEATURE_NAMES`].
pub const MONTHLY_INCOME_IDX: usize = 4;

/// Column index of `NumberOfDependents` in [`FEATURE_NAMES`].
pub const N_DEPENDENTS_IDX: usize = 9;

/// Feature indices that allow missing values (imputed from the median).
pub const IMPUTABLE_FEATURES: [usize; 2] = [MONTHLY_INCOME_IDX, N_DEPENDENTS_IDX];

/// A single applicant profile for inference.
///
/// Field order mirrors [`FEATURE_NAMES`]. `monthly_income` and
/// `n_dependents` may be `None` (or non-finite) and are imputed from the
/// training-time medians; every other field must be a finite number or
/// prediction fails with a descriptive error.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector {
    /// Total balance on revolving lines divided by the sum of credit limits.
    pub revolving_utilization: f32,
    /// Age of the borrower in years.
    pub age: f32,
    /// Times 30-59 days past due (but no worse) in the last two years.
    pub past_due_30_59: f32,
    /// Monthly debt payments divided by monthly gross income.
    pub debt_ratio: f32,
    /// Monthly income. Missing values are imputed.
    pub monthly_income: Option<f32>,
    /// Number of open loans and credit lines.
    pub open_credit_lines: f32,
    /// Times 90 or more days past due.
    pub past_due_90_plus: f32,
    /// Number of mortgage and real estate loans.
    pub real_estate_loans: f32,
    /// Times 60-89 days past due (but no worse) in the last two years.
    pub past_due_60_89: f32,
    /// Number of dependents. Missing values are imputed.
    pub n_dependents: Option<f32>,
}

impl FeatureVector {
    /// Mandatory fields as `(name, value)` pairs, in column order.
    ///
    /// Used by the predict boundary to report the first non-finite field
    /// by name.
    pub(crate) fn mandatory_fields(&self) -> [(&'static str, f32); 8] {
        [
            (FEATURE_NAMES[0], self.revolving_utilization),
            (FEATURE_NAMES[1], self.age),
            (FEATURE_NAMES[2], self.past_due_30_59),
            (FEATURE_NAMES[3], self.debt_ratio),
            (FEATURE_NAMES[5], self.open_credit_lines),
            (FEATURE_NAMES[6], self.past_due_90_plus),
            (FEATURE_NAMES[7], self.real_estate_loans),
            (FEATURE_NAMES[8], self.past_due_60_89),
        ]
    }

    /// Assemble the positional array, with the given substitutes for the
    /// two imputable fields.
    ///
    /// `income_default` and `dependents_default` are used when the
    /// corresponding field is `None` or non-finite.
    pub(crate) fn to_array(&self, income_default: f32, dependents_default: f32) -> [f32; N_FEATURES] {
        let income = match self.monthly_income {
            Some(v) if v.is_finite() => v,
            _ => income_default,
        };
        let dependents = match self.n_dependents {
            Some(v) if v.is_finite() => v,
            _ => dependents_default,
        };

        [
            self.revolving_utilization,
            self.age,
            self.past_due_30_59,
            self.debt_ratio,
            income,
            self.open_credit_lines,
            self.past_due_90_plus,
            self.real_estate_loans,
            self.past_due_60_89,
            dependents,
        ]
    }
}
