use rand::distributions::{Alphanumeric, DistString};
use std::fmt::{Debug, Write};
use std::sync::atomic::{AtomicUsize, Ordering};

/// The default length of generated tokens, in characters.
pub const DEFAULT_TOKEN_LENGTH: usize = 64;

/// A type with the ability to generate opaque tokens, used for session tokens and password reset tokens.
///
/// Generators are shared between concurrent requests, hence they take `&self`.
pub trait TokenGenerator: Debug + Send + Sync {
    /// Generate a token, i.e. a string that is a valid HTTP cookie value.
    fn generate_token(&self) -> String;
}

/// The default token generator with focus on security.
/// It uses [rand::thread_rng] as a random source and the [Alphanumeric] distribution to generate token strings.
/// This gives `log_2(26+26+10) ≥ 5.95` bits of entropy per character.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTokenGenerator<const TOKEN_LENGTH: usize = DEFAULT_TOKEN_LENGTH>;

impl<const TOKEN_LENGTH: usize> TokenGenerator for DefaultTokenGenerator<TOKEN_LENGTH> {
    fn generate_token(&self) -> String {
        let mut token = String::with_capacity(TOKEN_LENGTH);
        Alphanumeric.append_string(&mut rand::thread_rng(), &mut token, TOKEN_LENGTH);
        token
    }
}

/// A debug token generator that generates an ascending sequence of integers, formatted as strings padded with zeroes.
///
/// **Never use this outside of tests**, its tokens are trivially guessable.
#[derive(Debug, Default)]
pub struct DebugTokenGenerator<const TOKEN_LENGTH: usize = DEFAULT_TOKEN_LENGTH> {
    next_index: AtomicUsize,
}

impl<const TOKEN_LENGTH: usize> DebugTokenGenerator<TOKEN_LENGTH> {
    /// Create a generator whose first token encodes `first_index`.
    pub fn starting_at(first_index: usize) -> Self {
        Self {
            next_index: AtomicUsize::new(first_index),
        }
    }
}

impl<const TOKEN_LENGTH: usize> TokenGenerator for DebugTokenGenerator<TOKEN_LENGTH> {
    fn generate_token(&self) -> String {
        let index = self.next_index.fetch_add(1, Ordering::Relaxed);
        let mut token = String::with_capacity(TOKEN_LENGTH);
        // Writing into a String cannot fail.
        let _ = write!(&mut token, "{:0width$}", index, width = TOKEN_LENGTH);
        token
    }
}
