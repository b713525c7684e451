//! Plain-text replies for every outcome the bot reports.

use teamswitch_core::{CoreError, FactionFilter, Listing, QueuedSwitch, SwitchOutcome};

use crate::config::CommandNames;

/// Discord rejects messages over 2000 characters.
pub const MESSAGE_LIMIT: usize = 2000;

pub fn outcome(outcome: &SwitchOutcome) -> String {
    match outcome {
        SwitchOutcome::Switched { player } => format!("Switch request for {player} was successful."),
        SwitchOutcome::SwitchFailed { player } => format!("Switch request for {player} failed."),
        SwitchOutcome::Queued { player, target } => format!(
            "{target} is full. {player} was added to the queue and will be switched to {target} once there is room."
        ),
        SwitchOutcome::QueueFull { player } => {
            format!("The switch queue is full, the request for {player} was dropped. Please try again later.")
        }
        SwitchOutcome::NotPresent { player } => format!("{player} is not in the game right now."),
        SwitchOutcome::NoFaction { player } => format!("{player} is not on a team yet."),
        SwitchOutcome::PlayerLeft { player } => {
            format!("{player} left the game and was removed from the switch queue.")
        }
        SwitchOutcome::AlreadyOnTarget { player, target } => {
            format!("{player} is already on {target} and was removed from the switch queue.")
        }
    }
}

pub fn core_error(error: &CoreError, commands: &CommandNames) -> String {
    match error {
        CoreError::UnknownNumber(number) => format!(
            "Number {number} is not in the latest player list. Run {}{} again and pick a number from it.",
            commands.prefix, commands.players
        ),
        CoreError::MissingPlayerId(number) => {
            format!("Player number {number} has no player id, the switch cannot be requested.")
        }
        CoreError::InvalidFaction(value) => format!(
            "Filter must be axis or allies (e.g. {}{} axis), got '{value}'.",
            commands.prefix, commands.players
        ),
        CoreError::Fetch { backend, source } => {
            format!("Could not reach {backend}: {source}. Please try again.")
        }
        CoreError::NoBackends | CoreError::DuplicateBackend(_) => "RCON is not configured.".to_string(),
    }
}

fn filter_label(filter: FactionFilter) -> String {
    match filter {
        FactionFilter::All => "All teams".to_string(),
        FactionFilter::Only(faction) => faction.to_string(),
    }
}

/// One block per backend section; the last one says which listing it was.
pub fn listing_blocks(listing: &Listing, commands: &CommandNames) -> Vec<String> {
    let label = filter_label(listing.filter);
    let mut blocks: Vec<String> = listing
        .sections
        .iter()
        .map(|section| match &section.players {
            Err(error) => format!("Failed to fetch players from {}: {error}", section.backend),
            Ok(players) if players.is_empty() => format!(
                "{} - {label} (0 players)\nNo players on {} ({label}).",
                section.backend, section.backend
            ),
            Ok(players) => {
                let mut lines = vec![format!(
                    "{} - {label} ({} players)",
                    section.backend,
                    players.len()
                )];
                lines.extend(players.iter().map(|(number, name)| format!("{number}. {name}")));
                lines.join("\n")
            }
        })
        .collect();

    if let Some(last) = blocks.last_mut() {
        last.push_str(&format!(
            "\n\nList #{}. Use {}{} <number> to request a switch.",
            listing.generation, commands.prefix, commands.switch
        ));
    }
    blocks
}

pub fn queue_block(items: &[QueuedSwitch]) -> String {
    if items.is_empty() {
        return "The switch queue is empty.".to_string();
    }
    let mut lines = vec![format!("Switch queue ({} waiting):", items.len())];
    lines.extend(
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| format!("{}. {} -> {}", idx + 1, item.player_name, item.target)),
    );
    lines.join("\n")
}

/// Split text into chunks of at most `limit` bytes, preferring line breaks.
/// A char wider than `limit` still gets a chunk of its own.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for line in text.split('\n') {
        let needed = if current.is_empty() { line.len() } else { current.len() + 1 + line.len() };
        if needed <= limit {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        // A single line longer than the limit gets cut on char boundaries.
        let mut rest = line;
        while rest.len() > limit {
            let mut cut = limit;
            while !rest.is_char_boundary(cut) {
                cut -= 1;
            }
            if cut == 0 {
                // Always make progress, even when one char is wider than the limit.
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }
            chunks.push(rest[..cut].to_string());
            rest = &rest[cut..];
        }
        current.push_str(rest);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
