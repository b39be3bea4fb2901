//! Scientific pitch notation — converts "C4", "Eb2", "F#3" to MIDI numbers.

/// Parse a note name string into a MIDI note number.
///
/// Format: `<letter><optional accidental><octave>`
/// - Letter: C, D, E, F, G, A, B
/// - Accidental: # (sharp) or b (flat)
/// - Octave: -1 to 9 (C4 = middle C = MIDI 60)
pub fn parse_spn(name: &str) -> Option<u8> {
    let chars: Vec<char> = name.chars().collect();
    if chars.is_empty() {
        return None;
    }

    let base = semitone(chars[0])?;

    let mut i = 1;
    let accidental: i32 = if i < chars.len() && chars[i] == '#' {
        i += 1;
        1
    } else if i < chars.len() && chars[i] == 'b' {
        i += 1;
        -1
    } else {
        0
    };

    let octave_str: String = chars[i..].iter().collect();
    let octave: i32 = octave_str.parse().ok()?;

    // C-1 = 0, C4 = 60, A4 = 69
    let midi = (octave + 1) * 12 + base + accidental;

    if (0..=127).contains(&midi) {
        Some(midi as u8)
    } else {
        None
    }
}

/// Length of a scientific-pitch-note match anchored at `start`, if any.
///
/// Used by the lexer to classify `C4` as a note before keyword lookup. Only
/// non-negative octaves are recognized here; a `-` after the letter would
/// already have been lexed as an operator.
pub fn spn_length(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start;
    semitone(*chars.get(i)?)?;
    i += 1;

    if matches!(chars.get(i), Some('#') | Some('b')) {
        i += 1;
    }

    let digits_start = i;
    while matches!(chars.get(i), Some(c) if c.is_ascii_digit()) {
        i += 1;
    }
    if i == digits_start {
        return None;
    }

    Some(i - start)
}

fn semitone(letter: char) -> Option<i32> {
    match letter {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn middle_c() {
        assert_eq!(parse_spn("C4"), Some(60));
    }

    #[test]
    fn a4_concert() {
        assert_eq!(parse_spn("A4"), Some(69));
    }

    #[test]
    fn c_minus_1() {
        assert_eq!(parse_spn("C-1"), Some(0));
    }

    #[test]
    fn eb2() {
        assert_eq!(parse_spn("Eb2"), Some(39));
    }

    #[test]
    fn f_sharp_3() {
        assert_eq!(parse_spn("F#3"), Some(54));
    }

    #[test]
    fn g9_max() {
        assert_eq!(parse_spn("G9"), Some(127));
    }

    #[test]
    fn out_of_midi_range() {
        assert_eq!(parse_spn("B9"), None);
    }

    #[test]
    fn invalid_inputs() {
        assert_eq!(parse_spn(""), None);
        assert_eq!(parse_spn("X4"), None);
        assert_eq!(parse_spn("C"), None);
        assert_eq!(parse_spn("do"), None);
    }

    #[test]
    fn all_naturals_octave_4() {
        assert_eq!(parse_spn("C4"), Some(60));
        assert_eq!(parse_spn("D4"), Some(62));
        assert_eq!(parse_spn("E4"), Some(64));
        assert_eq!(parse_spn("F4"), Some(65));
        assert_eq!(parse_spn("G4"), Some(67));
        assert_eq!(parse_spn("A4"), Some(69));
        assert_eq!(parse_spn("B4"), Some(71));
    }

    #[test]
    fn anchored_match_lengths() {
        let chars: Vec<char> = "C4".chars().collect();
        assert_eq!(spn_length(&chars, 0), Some(2));

        let chars: Vec<char> = "F#3;".chars().collect();
        assert_eq!(spn_length(&chars, 0), Some(3));

        let chars: Vec<char> = "note".chars().collect();
        assert_eq!(spn_length(&chars, 0), None);

        // Bb10 — multi-digit octave consumed in full
        let chars: Vec<char> = "Bb10".chars().collect();
        assert_eq!(spn_length(&chars, 0), Some(4));
    }

    #[test]
    fn anchored_match_mid_slice() {
        let chars: Vec<char> = "x A4".chars().collect();
        assert_eq!(spn_length(&chars, 2), Some(2));
    }
}
