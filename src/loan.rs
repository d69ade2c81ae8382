use crate::error::{LoanError, LoanResult};
use log::{info, trace, warn};
use std::fmt;

/// Monthly income assumed for an income-driven plan when none is supplied.
pub const DEFAULT_MONTHLY_INCOME: f64 = 3000.;
/// Share of monthly income paid under the income-driven plan.
pub const IDR_INCOME_SHARE: f64 = 0.10;
/// Ceiling on the income-driven monthly payment.
pub const IDR_PAYMENT_CAP: f64 = 1500.;

/// Longest term accepted, in years.
pub const MAX_TERM_YEARS: u32 = 100;

const MONTHS_PER_YEAR: u32 = 12;
const DEC_PLACES: f64 = 2.;

#[derive(Clone, Copy, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RepaymentMode {
    Fixed,
    IncomeDriven,
}

impl fmt::Display for RepaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepaymentMode::Fixed => write!(f, "fixed"),
            RepaymentMode::IncomeDriven => write!(f, "income-driven"),
        }
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoanParameters {
    pub principal: f64,
    pub annual_rate_percent: f64,
    pub term_years: u32,
    pub monthly_income: Option<f64>,
    pub repayment_mode: RepaymentMode,
}

impl LoanParameters {
    pub fn new(
        principal: f64,
        annual_rate_percent: f64,
        term_years: u32,
        monthly_income: Option<f64>,
        repayment_mode: RepaymentMode,
    ) -> Self {
        Self {
            principal,
            annual_rate_percent,
            term_years,
            monthly_income,
            repayment_mode,
        }
    }

    pub fn fixed(principal: f64, annual_rate_percent: f64, term_years: u32) -> Self {
        Self::new(
            principal,
            annual_rate_percent,
            term_years,
            None,
            RepaymentMode::Fixed,
        )
    }

    pub fn income_driven(
        principal: f64,
        annual_rate_percent: f64,
        term_years: u32,
        monthly_income: Option<f64>,
    ) -> Self {
        Self::new(
            principal,
            annual_rate_percent,
            term_years,
            monthly_income,
            RepaymentMode::IncomeDriven,
        )
    }

    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_percent / 12. / 100.
    }

    pub fn total_months(&self) -> u32 {
        self.term_years.saturating_mul(MONTHS_PER_YEAR)
    }

    /// Income used by the income-driven plan. Missing or non-positive values
    /// fall back to [`DEFAULT_MONTHLY_INCOME`].
    pub fn resolved_income(&self) -> f64 {
        match self.monthly_income {
            Some(income) if income > 0. && income.is_finite() => income,
            _ => DEFAULT_MONTHLY_INCOME,
        }
    }

    fn validate(&self) -> LoanResult<()> {
        if !self.principal.is_finite() || self.principal <= 0. {
            return Err(LoanError::invalid(
                "principal",
                format!("must be a positive amount, got {}", self.principal),
            ));
        }
        if self.term_years == 0 {
            return Err(LoanError::invalid("term_years", "must be at least 1 year"));
        }
        if self.term_years > MAX_TERM_YEARS {
            return Err(LoanError::invalid(
                "term_years",
                format!(
                    "{} years is longer than the {} year maximum",
                    self.term_years, MAX_TERM_YEARS
                ),
            ));
        }
        if !self.annual_rate_percent.is_finite() || self.annual_rate_percent < 0. {
            return Err(LoanError::invalid(
                "annual_rate_percent",
                format!(
                    "must be zero or a positive percentage, got {}",
                    self.annual_rate_percent
                ),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, PartialEq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScheduleEntry {
    pub month: u32,
    pub payment: f64,
    pub interest: f64,
    pub principal_paid: f64,
    pub balance: f64,
}

impl ScheduleEntry {
    pub fn new(month: u32, payment: f64, interest: f64, principal_paid: f64, balance: f64) -> Self {
        Self {
            month,
            payment,
            interest,
            principal_paid,
            balance,
        }
    }
}

impl fmt::Display for ScheduleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "month {}, payment ${:.2}, interest ${:.2}, principal ${:.2}, balance ${:.2}",
            self.month, self.payment, self.interest, self.principal_paid, self.balance
        )
    }
}

/// First period in which the payment failed to cover the accrued interest.
#[derive(Clone, Copy, PartialEq, Debug)]
struct Shortfall {
    month: u32,
    interest: f64,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Schedule {
    repayment_mode: RepaymentMode,
    pmt_amount: f64,
    entries: Vec<ScheduleEntry>,
    shortfall: Option<Shortfall>,
}

impl Schedule {
    pub fn repayment_mode(&self) -> RepaymentMode {
        self.repayment_mode
    }

    /// Level payment before rounding.
    pub fn payment(&self) -> f64 {
        self.pmt_amount
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a 1-based month number.
    pub fn entry(&self, month: usize) -> Option<&ScheduleEntry> {
        month.checked_sub(1).and_then(|idx| self.entries.get(idx))
    }

    pub fn entry_info(&self, month: usize) -> String {
        match self.entry(month) {
            Some(entry) => entry.to_string(),
            None => "No payment information.".to_string(),
        }
    }

    /// The first `n` rows, for previews.
    pub fn head(&self, n: usize) -> &[ScheduleEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn total_paid(&self) -> f64 {
        round(self.entries.iter().map(|e| e.payment).sum(), DEC_PLACES)
    }

    pub fn total_interest(&self) -> f64 {
        round(self.entries.iter().map(|e| e.interest).sum(), DEC_PLACES)
    }

    pub fn final_balance(&self) -> f64 {
        self.entries.last().map_or(0., |e| e.balance)
    }

    pub fn is_negative_amortization(&self) -> bool {
        self.shortfall.is_some()
    }

    /// Fails when any period's payment did not cover its interest.
    pub fn ensure_amortizing(&self) -> LoanResult<()> {
        match self.shortfall {
            Some(Shortfall { month, interest }) => Err(LoanError::DegenerateAmortization {
                payment: self.pmt_amount,
                interest,
                month,
            }),
            None => Ok(()),
        }
    }

    pub fn show_amortization(&self) {
        for entry in &self.entries {
            println!("{}", entry);
        }
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a ScheduleEntry;
    type IntoIter = std::slice::Iter<'a, ScheduleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Builds the monthly schedule for `params`.
///
/// The running balance keeps full precision; only the emitted rows are
/// rounded. The schedule stops at the first month the balance reaches zero.
///
/// A payment that does not cover interest is not an error here: the balance
/// grows for the whole term and the schedule is flagged, see
/// [`Schedule::ensure_amortizing`].
pub fn generate(params: &LoanParameters) -> LoanResult<Schedule> {
    params.validate()?;

    let monthly_rate = params.monthly_rate();
    let total_months = params.total_months();
    let pmt_amount = get_pmt_amount(params)?;
    info!(
        "{} plan: principal ${:.2}, rate {}%, {} months, payment ${:.2}",
        params.repayment_mode, params.principal, params.annual_rate_percent, total_months, pmt_amount
    );

    let mut entries = Vec::new();
    let mut shortfall = None;
    let mut balance = params.principal;

    for month in 1..=total_months {
        let interest = balance * monthly_rate;
        let principal_paid = pmt_amount - interest;
        if principal_paid <= 0. && shortfall.is_none() {
            shortfall = Some(Shortfall { month, interest });
        }
        balance = (balance - principal_paid).max(0.);
        trace!(
            "month {}, interest {}, principal {}, end bal {}",
            month,
            interest,
            principal_paid,
            balance
        );

        entries.push(ScheduleEntry::new(
            month,
            round(pmt_amount, DEC_PLACES),
            round(interest, DEC_PLACES),
            round(principal_paid, DEC_PLACES),
            round(balance, DEC_PLACES),
        ));

        if balance <= 0. {
            break;
        }
    }

    if let Some(Shortfall { month, interest }) = shortfall {
        warn!(
            "payment ${:.2} does not cover interest ${:.2} from month {}; balance grows to ${:.2}",
            pmt_amount, interest, month, balance
        );
    }

    Ok(Schedule {
        repayment_mode: params.repayment_mode,
        pmt_amount,
        entries,
        shortfall,
    })
}

fn round(amt: f64, dec: f64) -> f64 {
    let rounded = (amt * 10_f64.powf(dec)).round() / 10_f64.powf(dec);
    // avoid "-0.00" in output
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}

fn get_pmt_amount(params: &LoanParameters) -> LoanResult<f64> {
    let pmt_amount = match params.repayment_mode {
        RepaymentMode::Fixed => {
            let pmt_rate = params.monthly_rate();
            let total_pmts = f64::from(params.total_months());
            if pmt_rate == 0. {
                params.principal / total_pmts
            } else {
                // 1 - (1 + r)^-n, kept accurate for rates near zero
                let discount = -(-total_pmts * pmt_rate.ln_1p()).exp_m1();
                (params.principal * pmt_rate) / discount
            }
        }
        RepaymentMode::IncomeDriven => {
            (params.resolved_income() * IDR_INCOME_SHARE).min(IDR_PAYMENT_CAP)
        }
    };

    if !pmt_amount.is_finite() {
        return Err(LoanError::invalid(
            "annual_rate_percent",
            format!("produces a non-finite payment ({})", pmt_amount),
        ));
    }
    Ok(pmt_amount)
}
