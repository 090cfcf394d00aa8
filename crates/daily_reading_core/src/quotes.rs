//! Built-in quotes sent when nothing else is available.

use rand::seq::SliceRandom;

pub const FALLBACK_QUOTES: [&str; 5] = [
    "*JUST FOR TODAY* my thoughts will be on my recovery, living and enjoying life without the use of drugs.",
    "*JUST FOR TODAY* I will have faith in someone in NA who believes in me and wants to help me in my recovery.",
    "*JUST FOR TODAY* I will have a program. I will try to follow it to the best of my ability.",
    "*JUST FOR TODAY*, through NA, I will try to get a better perspective on my life.",
    "*JUST FOR TODAY* I will be unafraid. My thoughts will be on my new associations, people who are not using and who have found a new way of life. So long as I follow that way, I have nothing to fear.",
];

pub fn fallback_quote() -> &'static str {
    FALLBACK_QUOTES
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_QUOTES[0])
}
