//! URL-safe slug generation.
//!
//! Slugs are unique in the primary store; the engine retries creation with a
//! randomized suffix on collision. Folding covers the diacritics that show
//! up in our catalog data (Turkish and Western European).

use rand::Rng;

/// Length of the randomized collision suffix.
pub const SUFFIX_LENGTH: usize = 4;

const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Build a lowercase, hyphen-separated slug from a title.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_dash = true; // suppress a leading dash

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_dash = false;
        } else if let Some(folded) = fold(c) {
            slug.push_str(folded);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Build a slug with a collision suffix appended.
#[must_use]
pub fn slugify_with_suffix(title: &str, suffix: &str) -> String {
    let base = slugify(title);
    if base.is_empty() {
        suffix.to_owned()
    } else {
        format!("{base}-{suffix}")
    }
}

/// Generate a random lowercase alphanumeric suffix.
#[must_use]
pub fn random_suffix(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| {
            let idx = rng.random_range(0..SUFFIX_CHARS.len());
            char::from(SUFFIX_CHARS[idx])
        })
        .collect()
}

/// ASCII approximation for non-ASCII letters we care about.
const fn fold(c: char) -> Option<&'static str> {
    match c {
        'ğ' | 'Ğ' => Some("g"),
        'ü' | 'Ü' | 'û' | 'ù' | 'ú' => Some("u"),
        'ş' | 'Ş' => Some("s"),
        'ı' | 'İ' | 'î' | 'ì' | 'í' => Some("i"),
        'ö' | 'Ö' | 'ô' | 'ò' | 'ó' => Some("o"),
        'ç' | 'Ç' => Some("c"),
        'ä' | 'à' | 'á' | 'â' | 'å' => Some("a"),
        'é' | 'è' | 'ê' | 'ë' => Some("e"),
        'ñ' => Some("n"),
        'ß' => Some("ss"),
        _ => None,
    }
}
