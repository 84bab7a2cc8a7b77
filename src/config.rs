//! Reads the launcher-supplied environment: `RANKMESH_WORLD_RANK` and
//! `RANKMESH_WORLD_SIZE`. A misconfigured launch fails loudly rather than
//! silently producing a phantom single-rank group.

use std::env;

pub const MAX_WORLD_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldConfig {
    pub rank: usize,
    pub size: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {0} is not a valid integer: {1}")]
    NotAnInteger(&'static str, std::num::ParseIntError),
    #[error("world size {0} is outside 1..={MAX_WORLD_SIZE}")]
    SizeOutOfRange(usize),
    #[error("rank {rank} is outside 0..{size}")]
    RankOutOfRange { rank: usize, size: usize },
}

const RANK_VAR: &str = "RANKMESH_WORLD_RANK";
const SIZE_VAR: &str = "RANKMESH_WORLD_SIZE";

fn read_var(name: &'static str) -> Result<usize, ConfigError> {
    let raw = env::var(name).map_err(|_| ConfigError::Missing(name))?;
    raw.trim()
        .parse::<usize>()
        .map_err(|e| ConfigError::NotAnInteger(name, e))
}

impl WorldConfig {
    /// Reads and validates the current process's place in the group.
    pub fn from_env() -> Result<WorldConfig, ConfigError> {
        let size = read_var(SIZE_VAR)?;
        if size == 0 || size > MAX_WORLD_SIZE {
            return Err(ConfigError::SizeOutOfRange(size));
        }
        let rank = read_var(RANK_VAR)?;
        if rank >= size {
            return Err(ConfigError::RankOutOfRange { rank, size });
        }
        Ok(WorldConfig { rank, size })
    }

    pub fn env_pair(rank: usize, size: usize) -> [(&'static str, String); 2] {
        [(RANK_VAR, rank.to_string()), (SIZE_VAR, size.to_string())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // `from_env` reads process-global environment variables, so tests that
    // touch RANK_VAR/SIZE_VAR must not run concurrently with each other.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_env<T>(pairs: &[(&str, &str)], f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for (name, _) in pairs {
            env::remove_var(name);
        }
        for (name, value) in pairs {
            env::set_var(name, value);
        }
        let result = f();
        env::remove_var(RANK_VAR);
        env::remove_var(SIZE_VAR);
        result
    }

    #[test]
    fn rejects_oversized_world() {
        let result = with_env(&[(SIZE_VAR, "17"), (RANK_VAR, "0")], WorldConfig::from_env);
        match result {
            Err(ConfigError::SizeOutOfRange(17)) => {}
            other => panic!("expected SizeOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn rejects_rank_past_the_end() {
        let result = with_env(&[(SIZE_VAR, "4"), (RANK_VAR, "4")], WorldConfig::from_env);
        match result {
            Err(ConfigError::RankOutOfRange { rank: 4, size: 4 }) => {}
            other => panic!("expected RankOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn accepts_a_well_formed_world() {
        let result = with_env(&[(SIZE_VAR, "4"), (RANK_VAR, "2")], WorldConfig::from_env);
        match result {
            Ok(cfg) => assert_eq!(cfg, WorldConfig { rank: 2, size: 4 }),
            other => panic!("expected Ok, got {other:?}"),
        }
    }

    #[test]
    fn env_pair_round_trips() {
        let pairs = WorldConfig::env_pair(2, 4);
        assert_eq!(pairs[0], (RANK_VAR, "2".to_string()));
        assert_eq!(pairs[1], (SIZE_VAR, "4".to_string()));
    }
}
