use std::fmt;

use serde::Serialize;

use crate::data::model::{CellValue, Table};
use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Trend analysis: OLS of a series against its ordinal position
// ---------------------------------------------------------------------------

/// Significance threshold for calling a trend direction.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendDirection::Increasing => write!(f, "increasing"),
            TrendDirection::Decreasing => write!(f, "decreasing"),
            TrendDirection::Stable => write!(f, "stable"),
        }
    }
}

/// Least-squares fit of value against row index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Two-sided p-value for slope ≠ 0 (Student-t, n − 2 df).
    pub p_value: f64,
    /// `Increasing`/`Decreasing` only when the slope is distinguishable from
    /// zero at [`SIGNIFICANCE_LEVEL`]; otherwise `Stable`.
    pub direction: TrendDirection,
}

/// Fit a trend over a series ordered by position. Non-finite entries are
/// dropped before fitting.
///
/// Errors: fewer than 2 usable points, or a constant series (zero variance
/// makes the fit degenerate).
pub fn fit_trend(values: &[f64]) -> Result<TrendResult> {
    let ys: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let n = ys.len();
    if n < 2 {
        return Err(Error::InsufficientData(
            "trend analysis needs at least 2 points",
        ));
    }

    let nf = n as f64;
    let mean_x = (nf - 1.0) / 2.0;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    let mut syy = 0.0;
    for (i, y) in ys.iter().enumerate() {
        let dx = i as f64 - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        sxy += dx * dy;
        syy += dy * dy;
    }

    if syy == 0.0 {
        return Err(Error::ConstantSeries);
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;
    let r = sxy / (sxx * syy).sqrt();
    let r_squared = r * r;

    let df = nf - 2.0;
    let p_value = if df <= 0.0 {
        // Two points always fit exactly; the slope is untestable.
        1.0
    } else if 1.0 - r_squared < 1e-12 {
        0.0
    } else {
        // Two-sided p for t = r·√(df/(1−r²)) via the regularized
        // incomplete beta: p = I_{df/(df+t²)}(df/2, 1/2).
        let t_squared = r_squared * df / (1.0 - r_squared);
        reg_inc_beta(df / 2.0, 0.5, df / (df + t_squared))
    };

    let direction = if p_value < SIGNIFICANCE_LEVEL && slope > 0.0 {
        TrendDirection::Increasing
    } else if p_value < SIGNIFICANCE_LEVEL && slope < 0.0 {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    };

    Ok(TrendResult {
        slope,
        intercept,
        r_squared,
        p_value,
        direction,
    })
}

/// Fit a trend for a numeric column ordered by a date column.
///
/// Rows missing either cell are dropped before the fit, matching the filter
/// stage's policy of excluding rather than raising on bad dates.
pub fn trend_over_dates(table: &Table, date_column: &str, value_column: &str) -> Result<TrendResult> {
    if !table.has_column(date_column) {
        return Err(Error::UnknownColumn(date_column.to_string()));
    }
    if !table.has_column(value_column) {
        return Err(Error::UnknownColumn(value_column.to_string()));
    }

    let mut points: Vec<(chrono::NaiveDate, f64)> = table
        .rows
        .iter()
        .filter_map(|row| {
            let date = row.get(date_column).and_then(CellValue::as_date)?;
            let value = row.get(value_column).and_then(CellValue::as_f64)?;
            value.is_finite().then_some((date, value))
        })
        .collect();
    points.sort_by_key(|(d, _)| *d);

    let values: Vec<f64> = points.into_iter().map(|(_, v)| v).collect();
    fit_trend(&values)
}

// ---------------------------------------------------------------------------
// Regularized incomplete beta (for the Student-t tail)
// ---------------------------------------------------------------------------

fn ln_gamma(x: f64) -> f64 {
    // Lanczos approximation, |error| < 2e-10 for x > 0.
    const COF: [f64; 6] = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];
    let mut ser = 1.000000000190015;
    let mut denom = x;
    for c in COF {
        denom += 1.0;
        ser += c / denom;
    }
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    -tmp + (2.5066282746310005 * ser / x).ln()
}

/// Continued-fraction evaluation (modified Lentz's method).
fn betacf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 3e-14;
    const FPMIN: f64 = 1e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut h = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        h *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let del = d * c;
        h *= del;
        if (del - 1.0).abs() < EPS {
            break;
        }
    }
    h
}

/// `I_x(a, b)`, the regularized incomplete beta function.
fn reg_inc_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }
    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();
    if x < (a + 1.0) / (a + b + 2.0) {
        front * betacf(a, b, x) / a
    } else {
        1.0 - front * betacf(b, a, 1.0 - x) / b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Row, Table};
    use chrono::NaiveDate;

    #[test]
    fn perfect_line_is_increasing() {
        let r = fit_trend(&[10.0, 12.0, 14.0, 16.0, 18.0]).unwrap();
        assert!((r.slope - 2.0).abs() < 1e-9);
        assert!((r.intercept - 10.0).abs() < 1e-9);
        assert!((r.r_squared - 1.0).abs() < 1e-9);
        assert!(r.p_value < 1e-6);
        assert_eq!(r.direction, TrendDirection::Increasing);
    }

    #[test]
    fn p_value_matches_reference() {
        // scipy.stats.linregress([0,1,2,3], [1,2,2,3]) → p ≈ 0.051317
        let r = fit_trend(&[1.0, 2.0, 2.0, 3.0]).unwrap();
        assert!((r.slope - 0.6).abs() < 1e-9);
        assert!((r.r_squared - 0.9).abs() < 1e-9);
        assert!((r.p_value - 0.051316701949).abs() < 1e-6);
        // just misses the threshold, so the label stays conservative
        assert_eq!(r.direction, TrendDirection::Stable);
    }

    #[test]
    fn noisy_decline_is_decreasing() {
        let values: Vec<f64> = (0..50).map(|i| 100.0 - 1.5 * i as f64 + ((i * 7) % 5) as f64).collect();
        let r = fit_trend(&values).unwrap();
        assert!(r.slope < 0.0);
        assert!(r.p_value < SIGNIFICANCE_LEVEL);
        assert_eq!(r.direction, TrendDirection::Decreasing);
    }

    #[test]
    fn two_points_are_untestable() {
        let r = fit_trend(&[1.0, 5.0]).unwrap();
        assert!((r.slope - 4.0).abs() < 1e-9);
        assert_eq!(r.p_value, 1.0);
        assert_eq!(r.direction, TrendDirection::Stable);
    }

    #[test]
    fn degenerate_inputs_fail_gracefully() {
        assert!(matches!(
            fit_trend(&[3.0]),
            Err(Error::InsufficientData(_))
        ));
        assert!(matches!(
            fit_trend(&[2.0, 2.0, 2.0]),
            Err(Error::ConstantSeries)
        ));
        assert!(matches!(
            fit_trend(&[f64::NAN, 1.0]),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn trend_over_dates_sorts_before_fitting() {
        let mk = |d: u32, v: f64| -> Row {
            let mut row = Row::new();
            row.insert(
                "date".into(),
                CellValue::Date(NaiveDate::from_ymd_opt(2023, 1, d).unwrap()),
            );
            row.insert("sales".into(), CellValue::Float(v));
            row
        };
        // rows arrive out of order but the underlying trend is a clean line
        let t = Table::from_rows(
            vec!["date".into(), "sales".into()],
            vec![mk(3, 30.0), mk(1, 10.0), mk(5, 50.0), mk(2, 20.0), mk(4, 40.0)],
        );
        let r = trend_over_dates(&t, "date", "sales").unwrap();
        assert!((r.slope - 10.0).abs() < 1e-9);
        assert_eq!(r.direction, TrendDirection::Increasing);
    }
}
