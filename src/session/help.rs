//! Help text for verbs and topics

use crate::script::Registry;

/// One-line description of each built-in verb.
pub const VERB_HELP: [(&str, &str); 24] = [
    ("become", "Become a visible vessel, the target vessel must be present and visible in the current parent vessel."),
    ("cast", "Remotely execute a program, optionally in the context of another vessel (using 'cast ... onto ...')"),
    ("commands", "List commands registered by scripts."),
    ("create", "Create a new vessel at your current location."),
    ("drop", "Move a visible vessel out of your current vessel into your parent vessel."),
    ("emote", "Add an emote message into the global dialog."),
    ("enter", "Enter a visible vessel."),
    ("exit", "Leave the session."),
    ("fold", "Make your vessel its own container."),
    ("forum", "Show the messages of your current location."),
    ("help", "Show help on a command or topic ('help with wildcards')."),
    ("inspect", "List details about a vessel."),
    ("leave", "Exit the parent vessel."),
    ("locate", "Locates a vessel by name."),
    ("look", "Lists all visible Vessels."),
    ("note", "Add a description to the current parent vessel."),
    ("print", "Print text, after wildcards are expanded."),
    ("program", "Add an automation program to a vessel, making it available to the use command. ('help with programming' for more info)"),
    ("say", "Add a message into the global dialog."),
    ("set", "Directly write flags of an owned vessel: set is_<locked|hidden|silent|tunnel> <true|false>."),
    ("signal", "Broadcast your current visible parent vessel."),
    ("take", "Move a visible vessel into your current vessel."),
    ("transform", "Change your current vessel's name and attribute."),
    ("use", "Execute a vessel's program."),
];

const WILDCARDS: &str = "\
Wildcards are dynamic text to be used in notes and programs to create responsive narratives.

Examples:
    <(vessel.name)> # return the name of the current vessel
    <(vessel.id)> # return the id of the current vessel
    <(vessel.parent.name)> # return the name of the current vessel's parent vessel
    <(vessel.parent.id)> # return the id of the current vessel's parent vessel
    <(find('residences').children|map(attribute='full_name')|join('\\n'))> # list the full names of the children of the first vessel named 'residences'

Available names: vessel, location, universe, atlas, spells, tunnels, time, nataniev(tz), find(id or name), and target while casting.";

const SPELLS: &str = "\
Spells are programs that can be activated from any location by using the 'cast' command.
A program needs to be programmed, locked, and have the '<something> spell' format to qualify.
Once a spell has been crafted, it can be used with the cast action, from anywhere, by all players.
Spells can also be cast onto other vessels which makes their program execute in the context of the vessel the spell is cast onto.";

const MOVEMENT: &str = "\
Movement is quite simple:
 - Use 'enter <vessel name>' to move your current vessel into another vessel
 - Use 'leave' to move your current vessel out of its current location and into the parent vessel
 - Use 'warp <id or name>' to move into a distant vessel
 - Use 'fold' to become your own container";

const COMMUNICATION: &str = "\
say <message> # writes a message to the public chat
emote <message> # writes an action to the public chat
signal # writes current location to the public chat";

const NARRATIVE: &str = "\
note <text> # change the description of a vessel
transform <text> # change the name and attribute of your current vessel";

const PROGRAMMING: &str = "\
A Vessel program is a piece of text containing wildcards that is evaluated,
when a vessel is used with the 'use' command.
An example program to check if the using vessel has a specific key could be:
<( 'warp '~vessel.random.id if ('warpgate key' in vessel.children|map(attribute='full_name')) else 'print you need a key to use this warpgate' )>
Programs starting with '%% ' are scripts, see 'help with scripting'.";

const SCRIPTING: &str = "\
Write 'program %% <script>' to store a script as the program of your container.
Scripts run in a sandbox with a fixed instruction budget. Host functions:
    me() here()               # the acting vessel and its location
    get(vessel, key)          # read a vessel attribute, e.g. get(me(), \"name\")
    set(vessel, key, value)   # write name, attr, note, program or a flag of a vessel you own
    search(text)              # vessels whose full name contains text
    render() render(text)     # the location note, or text, with wildcards expanded
    issue(line)               # run a command once the script finishes
    register(name, Fn(\"f\"), help)  # add a new command handled by f
    format(template, map) clock() repeat(text, n)";

fn topic(name: &str) -> Option<&'static str> {
    match name {
        "wildcards" => Some(WILDCARDS),
        "spells" => Some(SPELLS),
        "movement" => Some(MOVEMENT),
        "communication" => Some(COMMUNICATION),
        "narrative" => Some(NARRATIVE),
        "programming" => Some(PROGRAMMING),
        "scripting" => Some(SCRIPTING),
        _ => None,
    }
}

const TOPICS: [&str; 7] = [
    "communication",
    "movement",
    "narrative",
    "programming",
    "scripting",
    "spells",
    "wildcards",
];

/// Help for `name`, or the overview when `None`.
pub fn help(name: Option<&str>, registry: &Registry) -> Vec<String> {
    let Some(name) = name else {
        return overview(registry);
    };
    if let Some(text) = topic(name) {
        return text.lines().map(str::to_string).collect();
    }
    if let Some((_, text)) = VERB_HELP.iter().find(|(verb, _)| *verb == name) {
        return vec![text.to_string()];
    }
    if let Some(command) = registry.get(name) {
        return vec![command
            .help
            .clone()
            .unwrap_or_else(|| format!("{} has no help", name))];
    }
    vec![format!("*** No help on {}", name)]
}

fn columns(words: &[&str]) -> Vec<String> {
    words
        .chunks(8)
        .map(|row| row.join("  "))
        .collect()
}

fn overview(registry: &Registry) -> Vec<String> {
    let verbs: Vec<&str> = VERB_HELP.iter().map(|(verb, _)| *verb).collect();
    let mut lines = vec![
        String::new(),
        "Documented commands (type help <topic>):".to_string(),
        "========================================".to_string(),
    ];
    lines.extend(columns(&verbs));
    lines.push(String::new());
    lines.push("Miscellaneous help topics:".to_string());
    lines.push("==========================".to_string());
    lines.extend(columns(&TOPICS));
    if !registry.is_empty() {
        let names: Vec<&str> = registry.iter().map(|c| c.name.as_str()).collect();
        lines.push(String::new());
        lines.push("Registered commands:".to_string());
        lines.push("====================".to_string());
        lines.extend(columns(&names));
    }
    lines.push(String::new());
    lines
}
