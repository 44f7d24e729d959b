use getrandom::getrandom;

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_WIDTH: usize = 4;
const SUFFIX_SPACE: u32 = 36 * 36 * 36 * 36;

fn base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize] as char);
        value /= 36;
    }
    digits.iter().rev().collect()
}

fn base36_padded(mut value: u32, width: usize) -> String {
    let mut digits = vec!['0'; width];
    for slot in digits.iter_mut().rev() {
        *slot = BASE36[(value % 36) as usize] as char;
        value /= 36;
    }
    digits.into_iter().collect()
}

/// `rpt-<base36 seconds>-<4 random base36 chars>`.
pub fn generate_report_id(now: i64) -> Result<String, String> {
    let seconds =
        u64::try_from(now).map_err(|_| "report id requires a non-negative timestamp".to_string())?;
    let mut bytes = [0_u8; 4];
    getrandom(&mut bytes).map_err(|err| format!("failed to read randomness: {err}"))?;
    let sample = u32::from_le_bytes(bytes) % SUFFIX_SPACE;
    Ok(format!(
        "rpt-{}-{}",
        base36(seconds),
        base36_padded(sample, SUFFIX_WIDTH)
    ))
}
