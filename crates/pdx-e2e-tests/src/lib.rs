//! End-to-end smoke tests for the Pokedex platform. See `tests/`.
