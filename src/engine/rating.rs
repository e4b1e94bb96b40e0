use crate::model::Feedback;

/// Mean rating over a room's feedback, rounded to two decimals with
/// ties going away from zero. Rooms with no feedback read 0.0, not NaN.
pub fn average_rating(feedback: &[Feedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }
    let sum: u32 = feedback.iter().map(|f| u32::from(f.rating)).sum();
    let mean = f64::from(sum) / feedback.len() as f64;
    // f64::round rounds halves away from zero
    (mean * 100.0).round() / 100.0
}
