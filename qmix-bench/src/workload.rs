//! A small social-network workload: a primary mix of lookups and listings over people,
//! and a drill-down mix keyed by the entities the listings return.

use qmix::mix::QueryMix;
use qmix::pool::MemoryParameterPool;
use qmix::query::QueryTemplate;

/// Pool kind drill-down values are injected under.
pub const ENTITY_KIND: &str = "entity";

/// The read mix followed by the update mix.
pub fn primary_mix() -> QueryMix {
    let mut mix = read_mix();
    mix.append(&update_mix());
    mix
}

pub fn read_mix() -> QueryMix {
    QueryMix::weighted(
        "social",
        vec![
            (
                QueryTemplate::new("person_profile", "SELECT * FROM person WHERE id = '%person%'")
                    .with_params(["person"]),
                3,
            ),
            (
                QueryTemplate::new(
                    "friends_of",
                    "SELECT k.friend FROM knows k WHERE k.person = '%person%' ORDER BY k.since DESC",
                )
                .with_params(["person"])
                .with_entity_column("friend"),
                2,
            ),
            (
                QueryTemplate::new(
                    "tagged_posts",
                    "SELECT p.id, p.author FROM post p JOIN post_tag t ON t.post = p.id WHERE t.tag = '%tag%'",
                )
                .with_params(["tag"])
                .with_entity_column("author"),
                1,
            ),
        ],
    )
}

pub fn update_mix() -> QueryMix {
    QueryMix::new(
        "social_updates",
        vec![QueryTemplate::new("add_like", "INSERT INTO likes VALUES ('%person%', '%tag%')")
            .with_params(["person", "tag"])
            .as_update()],
    )
}

pub fn drill_down_mix() -> QueryMix {
    QueryMix::new(
        "drill_down",
        vec![QueryTemplate::new("entity_profile", "SELECT * FROM person WHERE id = '%entity%'")
            .with_params([ENTITY_KIND])],
    )
}

/// A pool of `people` people and a handful of tags.
pub fn seed_pool(seed: u64, people: usize) -> MemoryParameterPool {
    MemoryParameterPool::new(seed)
        .with_values("person", (0..people).map(|i| format!("person-{i}")))
        .with_values("tag", ["rust", "databases", "benchmarks", "graphs", "music"])
}
