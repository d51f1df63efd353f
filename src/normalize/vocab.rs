//! Static vocabulary backing name and specialty normalization.
//!
//! Every table here is part of the normalization contract: branch codes and
//! service words mirror what the operational systems emit, and the
//! spelling-variant map collapses the recurring transliterations of the same
//! given name to one canonical spelling.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Site/branch codes that appear appended to names and carry no identity.
pub const BRANCH_CODES: &[&str] = &["alw", "akw", "snb", "ahj", "afw", "fwz", "trd", "trad"];

/// Whole words that mark a string as a facility or service rather than a person.
pub const SERVICE_WORDS: &[&str] = &[
    "clinic",
    "screening",
    "dental",
    "endoscopy",
    "endoscopic",
    "er",
    "icu",
    "ent",
    "nutrition",
    "radiology",
    "imaging",
    "xray",
    "x-ray",
    "lab",
    "labs",
    "laboratory",
    "unit",
    "department",
    "dept",
    "center",
    "centre",
    "polyclinic",
    "ward",
    "opd",
    "ipd",
    "ot",
    "theatre",
    "therapy",
    "physio",
    "orthopedic",
    "orthopaedic",
    "derma",
    "dermatology",
    "pediatrics",
    "paediatrics",
    "gyne",
    "gyn",
    "obgyn",
    "ophthalmology",
    "urology",
    "cardio",
    "cardiology",
    "hepatology",
    "gastro",
    "snb",
    "fwz",
    "trd",
    "trad",
    "hospital",
    "homecare",
    "home",
    "care",
];

/// Academic/professional degree tokens dropped during tokenization.
pub const DEGREE_TOKENS: &[&str] = &[
    "md", "phd", "msc", "bsc", "frcs", "mrcp", "mrcgp", "facc", "facs", "fcps", "mbbs", "do",
    "dds", "dmd", "mba", "dch",
];

/// Titles stripped by the display-oriented person-name extractor.
pub const EXTRACT_TITLES: &[&str] = &[
    "dr", "doctor", "prof", "mr", "mrs", "ms", "miss", "md", "phd",
];

/// Per-token spelling aliases applied after the phrase-level variant pass.
pub const TOKEN_MAP: &[(&str, &str)] = &[
    ("mohammed", "mohamed"),
    ("muhammad", "mohamed"),
    ("mohamad", "mohamed"),
    ("muhamad", "mohamed"),
    ("ahmad", "ahmed"),
    ("youssef", "yousef"),
    ("yusuf", "yousef"),
    ("yousif", "yousef"),
    ("hussain", "hussein"),
    ("khalid", "khaled"),
    ("tariq", "tarek"),
    ("tareq", "tarek"),
    ("al", "el"),
];

/// Phrase-level spelling variants: canonical spelling -> known misspellings.
pub const SPELLING_VARIANTS: &[(&str, &[&str])] = &[
    (
        "abdelfatah",
        &[
            "abd el fattah",
            "abd el fatah",
            "abdel fattah",
            "abdel fatah",
            "abdelfattah",
            "abdul fatah",
        ],
    ),
    (
        "abdelrazek",
        &[
            "abd el razek",
            "abd el razik",
            "abdel razek",
            "abdel razik",
            "abdelrazik",
            "abdul razek",
        ],
    ),
    (
        "abdelrahman",
        &[
            "abd el rahman",
            "abdel rahman",
            "abd el rhman",
            "abdel rhman",
            "abdulrahman",
            "abdurrahman",
        ],
    ),
    (
        "abdallah",
        &[
            "abd allah",
            "abdellah",
            "abd ellah",
            "abdullah",
            "abdulah",
            "abdulla",
        ],
    ),
    (
        "mohamed",
        &[
            "mohammed",
            "mohamad",
            "muhamed",
            "mohammod",
            "mohammad",
            "muhamad",
            "muhammed",
        ],
    ),
    (
        "ahmed",
        &["ahmad", "ahmet", "ahmmed", "ahmd", "ahmid", "ahmade"],
    ),
    (
        "mostafa",
        &[
            "mustafa", "moustafa", "mustpha", "mostpha", "mustapha", "mstafa",
        ],
    ),
    (
        "fatma",
        &[
            "fatima", "fatimah", "fatmah", "fatmeh", "fatemah", "fatema", "fatimeh",
        ],
    ),
    (
        "yousef",
        &[
            "youssef", "yousif", "yusef", "yusif", "youssif", "yosef", "usif",
        ],
    ),
    (
        "sherif",
        &[
            "shareef", "shereef", "sharif", "shareif", "sheref", "sharef",
        ],
    ),
    ("fathy", &["fathi", "fathii", "fathie", "fatthy", "fathey"]),
    ("ali", &["aly", "alee", "alii", "aalee", "aaly"]),
];

/// Stop-words removed from specialty strings before canonical matching.
pub const SPECIALTY_STOPWORDS: &[&str] = &[
    "service",
    "services",
    "dept",
    "department",
    "unit",
    "clinic",
    "center",
    "centre",
    "polyclinic",
    "ward",
    "opd",
    "ipd",
    "section",
    "division",
    "of",
];

/// Specialty token abbreviations applied before canonical matching.
pub const SPECIALTY_TOKEN_MAP: &[(&str, &str)] = &[
    ("obgyn", "obgyn"),
    ("ob", "obstetrics"),
    ("gyn", "gyne"),
    ("gi", "gastro"),
    ("ent", "ent"),
    ("derma", "derma"),
    ("ortho", "ortho"),
    ("ophtha", "ophtha"),
    ("x-ray", "xray"),
    ("xray", "xray"),
    ("a&e", "er"),
    ("ed", "er"),
];

/// Canonical specialty -> synonym list.
pub const SPECIALTY_CANONICAL: &[(&str, &[&str])] = &[
    (
        "dental",
        &[
            "dentistry",
            "dental service",
            "dental clinic",
            "dent",
            "oral",
            "odontology",
        ],
    ),
    (
        "dermatology",
        &["derma", "skin", "dermatologic", "dermatology clinic"],
    ),
    (
        "ent",
        &[
            "otolaryngology",
            "ear nose throat",
            "ent clinic",
            "ent department",
        ],
    ),
    (
        "pediatrics",
        &[
            "paediatrics",
            "peds",
            "children",
            "child health",
            "pediatrics clinic",
        ],
    ),
    (
        "gynecology & obstetrics",
        &["gyn", "obgyn", "ob/gyn", "gyne", "obstetrics", "obstetric", "ob"],
    ),
    ("cardiology", &["cardio", "heart", "cardiac"]),
    ("urology", &["uro", "urinary"]),
    (
        "radiology",
        &[
            "imaging",
            "xray",
            "x-ray",
            "radiology dept",
            "diagnostic imaging",
        ],
    ),
    ("gastroenterology", &["gastro", "gi", "digestive"]),
    ("hepatology", &["hepa", "liver"]),
    (
        "ophthalmology",
        &["ophtha", "ophthalmic", "eye", "eye clinic"],
    ),
    (
        "orthopedics",
        &[
            "orthopedic",
            "orthopaedic",
            "ortho",
            "bones",
            "orthopedics clinic",
        ],
    ),
    ("nutrition", &["diet", "dietary", "nutrition clinic"]),
    ("icu", &["intensive care", "critical care"]),
    (
        "er",
        &[
            "emergency",
            "a&e",
            "casualty",
            "ed",
            "emergency department",
            "accident & emergency",
        ],
    ),
    ("endoscopy", &["endoscopic", "endoscopy unit"]),
    ("lab", &["laboratory", "labs", "pathology", "lab services"]),
    ("neurology", &["neuro", "nervous system"]),
    ("oncology", &["cancer", "onco"]),
    ("nephrology", &["renal", "kidney"]),
    ("endocrinology", &["endo", "hormones"]),
    ("psychiatry", &["psych", "mental health"]),
    ("pulmonology", &["respiratory", "chest", "pulmonary"]),
];

fn word_alternation(words: &[&str]) -> String {
    // Longest-first so multi-word phrases win over their own prefixes.
    let mut sorted: Vec<&str> = words.to_vec();
    sorted.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    sorted
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|")
}

lazy_static! {
    /// Bracketed/braced annotations: {...}, [...], (...), ${...}.
    pub static ref BRACKETED: Regex =
        Regex::new(r"(\{.*?\}|\[.*?\]|\(.*?\)|\$\{.*?\})").unwrap();

    /// Everything except word characters, whitespace and hyphens.
    pub static ref NON_WORD: Regex = Regex::new(r"[^\w\s\-]").unwrap();

    pub static ref MULTISPACE: Regex = Regex::new(r"\s+").unwrap();

    /// Token separator: runs of whitespace and/or hyphens.
    pub static ref HYPHEN_SPLIT: Regex = Regex::new(r"[\s\-]+").unwrap();

    /// Professional titles with an optional trailing period.
    pub static ref TITLE_RE: Regex = Regex::new(
        r"(?i)\b(dr|doctor|prof|mr|mrs|ms|miss|md|phd|msc|bsc|consultant|specialist)\b\.?"
    )
    .unwrap();

    pub static ref BRANCH_CODE_RE: Regex = Regex::new(&format!(
        r"(?i)\b({})\b",
        word_alternation(BRANCH_CODES)
    ))
    .unwrap();

    pub static ref SERVICE_RE: Regex = Regex::new(&format!(
        r"(?i)\b({})\b",
        word_alternation(SERVICE_WORDS)
    ))
    .unwrap();

    /// Facility-type suffix at the very end of the string.
    pub static ref FACILITY_SUFFIX_RE: Regex = Regex::new(
        r"(?i)\b(clinic|centre|center|department|unit|polyclinic|hospital|ward)\b$"
    )
    .unwrap();

    /// "Abd el"/"Abd-al" and friends collapse to a single "abdel".
    pub static ref ABD_RE: Regex =
        Regex::new(r"(?i)\babd(?:\s*[\-_])*\s*(?:el|al)\b").unwrap();

    /// A lone leading "a " before a word is the article "al".
    pub static ref LEADING_ARTICLE_RE: Regex = Regex::new(r"\ba\s+([a-z])").unwrap();

    /// One alternation over every known misspelling, longest-first.
    pub static ref VARIANT_RE: Regex = {
        let wrongs: Vec<&str> = SPELLING_VARIANTS
            .iter()
            .flat_map(|(_, ws)| ws.iter().copied())
            .collect();
        Regex::new(&format!(r"(?i)\b({})\b", word_alternation(&wrongs))).unwrap()
    };

    /// Misspelling -> canonical spelling, lowercased keys.
    pub static ref VARIANT_MAP: HashMap<&'static str, &'static str> = {
        let mut map = HashMap::new();
        for (canon, wrongs) in SPELLING_VARIANTS {
            for wrong in *wrongs {
                map.insert(*wrong, *canon);
            }
        }
        map
    };

    pub static ref TOKEN_ALIASES: HashMap<&'static str, &'static str> =
        TOKEN_MAP.iter().copied().collect();

    pub static ref DEGREE_SET: HashSet<&'static str> = DEGREE_TOKENS.iter().copied().collect();

    pub static ref BRANCH_SET: HashSet<&'static str> = BRANCH_CODES.iter().copied().collect();

    pub static ref SERVICE_SET: HashSet<&'static str> = SERVICE_WORDS.iter().copied().collect();

    pub static ref EXTRACT_TITLE_SET: HashSet<&'static str> =
        EXTRACT_TITLES.iter().copied().collect();

    pub static ref SPECIALTY_STOP_SET: HashSet<&'static str> =
        SPECIALTY_STOPWORDS.iter().copied().collect();

    pub static ref SPECIALTY_TOKEN_ALIASES: HashMap<&'static str, &'static str> =
        SPECIALTY_TOKEN_MAP.iter().copied().collect();

    pub static ref WORD_RE: Regex = Regex::new(r"\w+").unwrap();
}

/// Replace every known misspelling in `text` with its canonical spelling.
/// Matching is case-insensitive; the substituted text is always lowercase.
pub fn apply_spelling_variants(text: &str) -> String {
    VARIANT_RE
        .replace_all(text, |caps: &regex::Captures| {
            let found = caps[0].to_lowercase();
            match VARIANT_MAP.get(found.as_str()) {
                Some(canon) => (*canon).to_string(),
                None => found,
            }
        })
        .into_owned()
}
