//! Turns inbound text lines into coordinator commands.


use crate::coordinator::CommandError;
use crate::engine::SeekDirection;

/// Commands understood by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    PlayUrl(String),
    /// With a query: search and play. Without: toggle pause.
    PlayOrPause(Option<String>),
    Next,
    Previous,
    Volume(Option<u32>),
    GetLink,
    Duration,
    /// Without an index: list recent history. With one: replay that entry.
    History(Option<usize>),
    Download(Option<String>),
    Stop,
    /// `amount` is `None` when the argument was absent or not an integer.
    Seek { direction: SeekDirection, amount: Option<i64> },
    Help,
}

/// Name, short alias and help line of every prefixed command.
pub const COMMAND_TABLE: &[(&str, &str, &str)] = &[
    ("play-url", "u", "Plays a stream from a URL. Usage: play-url <link>"),
    ("play-or-pause", "p", "Searches and plays the first result; without arguments pauses or resumes. Usage: play-or-pause [query]"),
    ("next", "n", "Plays the next track in the search results."),
    ("previous", "b", "Plays the previous track in the search results."),
    ("volume", "v", "Changes playback volume; without arguments shows it. Usage: volume [level]"),
    ("get-link", "gl", "Gets the link of the currently playing track."),
    ("duration", "d", "Shows the duration of the current track."),
    ("history", "r", "Shows recent tracks, or plays one from history. Usage: history [index]"),
    ("download", "dl", "Downloads the current or given track as an audio file. Usage: download [link]"),
    ("stop", "s", "Stops playback."),
    ("help", "h", "Shows this help."),
];

/// Help text listing every command with the given prefix.
pub fn help_text(prefix: &str) -> String {
    let mut lines = vec!["+<seconds> / -<seconds>: seek forward or back".to_string()];
    lines.extend(
        COMMAND_TABLE
            .iter()
            .map(|(name, alias, help)| format!("{}{} ({}{}): {}", prefix, name, prefix, alias, help)),
    );
    lines.join("\n")
}

/// Parses one line of chat text.
///
/// Returns `Ok(None)` for text that is not addressed to the bot.
pub fn parse(line: &str, prefix: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();

    if let Some(rest) = line.strip_prefix('+') {
        return Ok(Some(seek(SeekDirection::Forward, rest)));
    }
    if let Some(rest) = line.strip_prefix('-') {
        return Ok(Some(seek(SeekDirection::Back, rest)));
    }

    let Some(body) = line.strip_prefix(prefix) else {
        return Ok(None);
    };
    let mut words = body.split_whitespace();
    let Some(token) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let joined = (!args.is_empty()).then(|| args.join(" "));

    let command = match token.to_lowercase().as_str() {
        "play-url" | "u" => {
            let link = joined.ok_or_else(|| usage(prefix, "play-url <link>"))?;
            Command::PlayUrl(link)
        }
        "play-or-pause" | "p" => Command::PlayOrPause(joined),
        "next" | "n" => Command::Next,
        "previous" | "b" => Command::Previous,
        "volume" | "v" => match args.first() {
            None => Command::Volume(None),
            Some(value) => {
                let volume = value.parse::<u32>().map_err(|_| usage(prefix, "volume [volume_level]"))?;
                Command::Volume(Some(volume))
            }
        },
        "get-link" | "gl" => Command::GetLink,
        "duration" | "d" => Command::Duration,
        "history" | "r" => match args.first() {
            None => Command::History(None),
            Some(value) => {
                let index = value.parse::<usize>().map_err(|_| usage(prefix, "history <index>"))?;
                Command::History(Some(index))
            }
        },
        "download" | "dl" => Command::Download(joined),
        "stop" | "s" => Command::Stop,
        "help" | "h" => Command::Help,
        _ => return Err(CommandError::Usage(format!("Unknown command '{}'.\n{}", token, help_text(prefix)))),
    };
    Ok(Some(command))
}

fn seek(direction: SeekDirection, argument: &str) -> Command {
    Command::Seek {
        direction,
        amount: argument.trim().parse::<i64>().ok(),
    }
}

fn usage(prefix: &str, form: &str) -> CommandError {
    CommandError::Usage(format!("Invalid command. Usage: {}{}", prefix, form))
}
