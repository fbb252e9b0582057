// src/builtin/grid.rs

//! A small grid-navigation environment.
//!
//! Level files look like:
//!
//! ```toml
//! width = 5
//! height = 4
//! start = [0, 0]
//! goal = [4, 3]
//! goal_reward = 10.0
//! walls = [[1, 1], [2, 1]]
//! ```

use std::collections::HashSet;

use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::json;

use crate::workload::{Environment, Observation, RewardOutcome, WorkItem, WorkloadRoot};

pub const KIND: &str = "grid";

#[derive(Debug, Clone, Deserialize)]
pub struct GridLevel {
    pub width: u32,
    pub height: u32,
    #[serde(default)]
    pub start: [u32; 2],
    pub goal: [u32; 2],
    #[serde(default = "default_goal_reward")]
    pub goal_reward: f64,
    #[serde(default)]
    pub walls: Vec<[u32; 2]>,
}

fn default_goal_reward() -> f64 {
    1.0
}

impl GridLevel {
    fn check(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            bail!("grid must be at least 1x1 (got {}x{})", self.width, self.height);
        }
        for (name, [x, y]) in [("start", self.start), ("goal", self.goal)] {
            if x >= self.width || y >= self.height {
                bail!("{name} ({x}, {y}) lies outside the grid");
            }
        }
        Ok(())
    }
}

#[derive(Debug)]
struct Episode {
    level: GridLevel,
    walls: HashSet<[u32; 2]>,
    pos: [u32; 2],
    reached: bool,
    last_events: Vec<String>,
    last_reward: f64,
}

/// Moves an agent over a bounded grid towards a goal cell.
#[derive(Debug)]
pub struct GridEnvironment {
    env_id: String,
    episode: Option<Episode>,
}

impl GridEnvironment {
    pub fn new(env_id: impl Into<String>) -> Self {
        Self {
            env_id: env_id.into(),
            episode: None,
        }
    }

    pub fn env_id(&self) -> &str {
        &self.env_id
    }

    fn episode(&mut self) -> Result<&mut Episode> {
        match self.episode.as_mut() {
            Some(ep) => Ok(ep),
            None => bail!("{}: step before reset", self.env_id),
        }
    }
}

impl Episode {
    fn observe(&self) -> Observation {
        json!({
            "position": self.pos,
            "goal": self.level.goal,
            "done": self.reached,
        })
    }
}

impl Environment for GridEnvironment {
    fn reset(&mut self, item: &WorkItem) -> Result<Observation> {
        let level: GridLevel = item.parse()?;
        level.check()?;

        let episode = Episode {
            walls: level.walls.iter().copied().collect(),
            pos: level.start,
            reached: level.start == level.goal,
            last_events: Vec::new(),
            last_reward: 0.0,
            level,
        };
        let obs = episode.observe();
        self.episode = Some(episode);
        Ok(obs)
    }

    fn step(&mut self, action: &str) -> Result<Observation> {
        let ep = self.episode()?;
        ep.last_events.clear();
        ep.last_reward = 0.0;

        if ep.reached {
            return Ok(ep.observe());
        }

        let [x, y] = ep.pos;
        let target = match action.trim() {
            "up" => y.checked_sub(1).map(|y| [x, y]),
            "down" => Some([x, y + 1]).filter(|[_, y]| *y < ep.level.height),
            "left" => x.checked_sub(1).map(|x| [x, y]),
            "right" => Some([x + 1, y]).filter(|[x, _]| *x < ep.level.width),
            _ => {
                ep.last_events.push("invalid_action".to_string());
                return Ok(ep.observe());
            }
        };

        match target {
            Some(cell) if !ep.walls.contains(&cell) => {
                ep.pos = cell;
                ep.last_events.push("moved".to_string());
                if cell == ep.level.goal {
                    ep.reached = true;
                    ep.last_reward = ep.level.goal_reward;
                    ep.last_events.push("reached_goal".to_string());
                }
            }
            _ => ep.last_events.push("bumped_wall".to_string()),
        }

        Ok(ep.observe())
    }

    fn reward(&mut self) -> Result<RewardOutcome> {
        let ep = self.episode()?;
        Ok(RewardOutcome {
            reward: ep.last_reward,
            events: ep.last_events.clone(),
            info: json!({ "position": ep.pos }),
        })
    }

    fn done(&self) -> bool {
        self.episode.as_ref().is_some_and(|ep| ep.reached)
    }
}

/// Factory registered under [`KIND`].
pub fn factory(_root: &WorkloadRoot, env_id: &str) -> Result<Box<dyn Environment>> {
    Ok(Box::new(GridEnvironment::new(env_id)))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::types::ItemSource;

    fn item(raw: &str) -> WorkItem {
        WorkItem {
            id: "t".into(),
            source: ItemSource::Test,
            path: PathBuf::from("/w/levels/t.toml"),
            raw: raw.into(),
        }
    }

    const LEVEL: &str = r#"
        width = 3
        height = 2
        goal = [2, 0]
        goal_reward = 5.0
        walls = [[1, 1]]
    "#;

    #[test]
    fn walking_to_goal_pays_once() {
        let mut env = GridEnvironment::new("g");
        env.reset(&item(LEVEL)).unwrap();

        env.step("down").unwrap();
        assert_eq!(env.reward().unwrap().events, vec!["moved"]);

        env.step("right").unwrap();
        assert_eq!(env.reward().unwrap().events, vec!["bumped_wall"]);

        env.step("up").unwrap();
        env.step("right").unwrap();
        env.step("right").unwrap();
        let out = env.reward().unwrap();
        assert_eq!(out.reward, 5.0);
        assert_eq!(out.events, vec!["moved", "reached_goal"]);
        assert!(env.done());

        env.step("left").unwrap();
        assert_eq!(env.reward().unwrap().reward, 0.0);
    }

    #[test]
    fn edges_and_unknown_actions_are_events() {
        let mut env = GridEnvironment::new("g");
        env.reset(&item(LEVEL)).unwrap();

        env.step("up").unwrap();
        assert_eq!(env.reward().unwrap().events, vec!["bumped_wall"]);
        env.step("jump").unwrap();
        assert_eq!(env.reward().unwrap().events, vec!["invalid_action"]);
    }

    #[test]
    fn rejects_out_of_bounds_goal_and_step_before_reset() {
        let mut env = GridEnvironment::new("g");
        assert!(env.step("up").is_err());
        assert!(env.reset(&item("width = 2\nheight = 2\ngoal = [5, 0]")).is_err());
    }
}
