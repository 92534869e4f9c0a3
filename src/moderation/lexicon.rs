//! Static phrase lists for the light moderation gate.
//!
//! All phrases are lowercase; the gate lowercases input before matching.
//! Blocking lists cover explicit self-harm and suicide phrasing - content
//! matching them is refused before anything is persisted. The flag list
//! covers abuse, threats and general toxicity - matching content is stored
//! but flagged for moderators.

/// Suicide phrasing. Matches block the submission entirely.
pub const SUICIDE_PHRASES: &[&str] = &[
    "kill myself",
    "suicide",
    "end my life",
    "want to die",
    "take my own life",
    "better off dead",
    "end it all",
    "goodbye forever",
];

/// Self-harm phrasing. Matches block the submission entirely.
pub const SELF_HARM_PHRASES: &[&str] = &[
    "cut myself",
    "hurt myself",
    "self harm",
    "cutting myself",
    "overdose",
    "swallow pills",
];

/// Abuse, threat and toxicity phrases. Matches are flagged, not blocked.
pub const FLAGGED_PHRASES: &[&str] = &[
    // --- Abuse / hate ---
    "i hate you",
    "you are stupid",
    "you are an idiot",
    "kill yourself",
    "go die",
    "nobody likes you",
    "piece of shit",
    "waste of space",
    "worthless",
    "drink bleach",
    "hope you die",
    "rot in hell",
    "get cancer",
    "die in a fire",
    // --- Threats / violence ---
    "i will kill you",
    "i'm going to kill you",
    "murder you",
    "stab you",
    "shoot you",
    "beat you up",
    "hunt you down",
    "find where you live",
    "doxx you",
    "swat you",
    "poison you",
    "strangle you",
    "watch your back",
    "i am coming for you",
    // --- General toxic ---
    "hate everyone",
    "everyone sucks",
    "world is shit",
    "you will regret this",
];
