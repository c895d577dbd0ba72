//! Relative Strength Index (RSI).
//!
//! Uses Wilder smoothing of average gains and average losses.
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss)
//! Edge cases: avg_loss == 0 → RSI = 100; avg_gain == 0 → RSI = 0;
//! no movement at all → RSI = 50.

/// Compute the trailing RSI value over a close series.
///
/// Returns `None` when fewer than `window` closes are available
/// (insufficient data). With exactly `window` closes the seed averages run
/// over the available `window - 1` deltas; with more, the standard Wilder
/// seed over the first `window` deltas is smoothed across the remainder.
pub fn rsi(closes: &[f64], window: usize) -> Option<f64> {
    if window == 0 || closes.len() < window {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    if changes.iter().any(|c| c.is_nan()) {
        return None;
    }
    if changes.is_empty() {
        return Some(50.0); // single close, no movement observable
    }

    let seed_len = changes.len().min(window);
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for &ch in &changes[..seed_len] {
        if ch > 0.0 {
            avg_gain += ch;
        } else {
            avg_loss -= ch;
        }
    }
    avg_gain /= seed_len as f64;
    avg_loss /= seed_len as f64;

    // Wilder smoothing over whatever follows the seed window.
    let alpha = 1.0 / window as f64;
    for &ch in &changes[seed_len..] {
        let gain = if ch > 0.0 { ch } else { 0.0 };
        let loss = if ch < 0.0 { -ch } else { 0.0 };
        avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
        avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
    }

    Some(rsi_from_averages(avg_gain, avg_loss))
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 && avg_gain == 0.0 {
        50.0 // no movement
    } else if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
