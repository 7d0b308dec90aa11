//! Default advice loaded into an empty store.

use crate::store::{AdviceResult, SqliteAdviceStore};
use crate::types::NewAdvice;

const DEFAULT_ADVICE: &[(&str, &[i64])] = &[
    (
        "Profiter de l'hiver pour organiser vos cultures et commander vos graines.",
        &[1, 2, 3],
    ),
    (
        "Arrosez vos plantes le matin pour minimiser l'évaporation de l'eau et maximiser l'absorption par les racines.",
        &[1, 2, 3],
    ),
    (
        "Utilisez un paillis pour conserver l'humidité du sol et réduire la croissance des mauvaises herbes.",
        &[4, 5, 6],
    ),
    (
        "Fertilisez vos plantes avec des engrais naturels pour favoriser leur croissance.",
        &[7, 8, 9],
    ),
    (
        "Récoltez vos légumes au bon moment pour profiter de leur saveur optimale.",
        &[10, 11, 12],
    ),
    (
        "Planifiez la rotation de vos cultures pour maintenir la santé du sol.",
        &[1, 4, 8, 12],
    ),
    (
        "Surveillez régulièrement vos plantes pour détecter les signes de maladies ou de parasites.",
        &[3, 6, 9, 11],
    ),
    (
        "Compostez vos déchets de jardin pour créer un sol riche en nutriments.",
        &[5, 7, 10],
    ),
    (
        "Utilisez des méthodes de jardinage durables pour préserver l'environnement.",
        &[2, 4, 6, 8, 10, 12],
    ),
    (
        "Profitez de votre jardin pour vous détendre et vous reconnecter avec la nature.",
        &[1, 3, 5, 7, 9, 11],
    ),
];

/// The built-in advice set.
pub fn default_advice() -> Vec<NewAdvice> {
    DEFAULT_ADVICE
        .iter()
        .map(|(description, months)| NewAdvice {
            description: (*description).to_string(),
            months: months.to_vec(),
        })
        .collect()
}

/// Load the built-in advice if the store is empty. Returns how many were inserted.
pub fn seed_fixtures(store: &SqliteAdviceStore) -> AdviceResult<usize> {
    if store.count()? > 0 {
        tracing::debug!("Advice store already populated, skipping fixtures");
        return Ok(0);
    }

    let advice = default_advice();
    for item in &advice {
        store.create(item)?;
    }
    tracing::info!("Seeded {} default advice entries", advice.len());
    Ok(advice.len())
}
