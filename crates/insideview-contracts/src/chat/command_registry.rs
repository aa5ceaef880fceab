#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
}

/// Commands whose whole argument becomes one request field.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SettingSpec {
    pub command: &'static str,
    pub field: &'static str,
}

pub(crate) const SETTING_COMMANDS: &[SettingSpec] = &[
    SettingSpec {
        command: "object",
        field: "object_name",
    },
    SettingSpec {
        command: "category",
        field: "category",
    },
    SettingSpec {
        command: "mode",
        field: "mode",
    },
    SettingSpec {
        command: "aspect",
        field: "aspect_ratio",
    },
    SettingSpec {
        command: "detail",
        field: "detail_level",
    },
    SettingSpec {
        command: "hint",
        field: "user_hint",
    },
];

pub(crate) const TOGGLE_COMMANDS: &[SettingSpec] = &[
    SettingSpec {
        command: "labels",
        field: "show_labels",
    },
    SettingSpec {
        command: "kid",
        field: "is_kid_friendly",
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "preset",
        action: "apply_preset",
    },
    CommandSpec {
        command: "connect",
        action: "connect",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "photo",
    action: "set_reference_image",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "generate",
        action: "generate",
    },
    CommandSpec {
        command: "prompt",
        action: "show_prompt",
    },
    CommandSpec {
        command: "parts",
        action: "show_parts",
    },
    CommandSpec {
        command: "history",
        action: "show_history",
    },
    CommandSpec {
        command: "stats",
        action: "show_stats",
    },
    CommandSpec {
        command: "presets",
        action: "list_presets",
    },
    CommandSpec {
        command: "help",
        action: "help",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
    },
];

pub(crate) const DELETE_COMMAND: CommandSpec = CommandSpec {
    command: "delete",
    action: "delete",
};

pub(crate) const EXPORT_COMMAND: CommandSpec = CommandSpec {
    command: "export",
    action: "export",
};

pub const STUDIO_HELP_COMMANDS: &[(&str, &str)] = &[
    ("/object <name>", "set the object to explode"),
    ("/category <technical|electronics|organic>", "set the subject category"),
    ("/mode <text|photo>", "switch between text and photo mode"),
    ("/aspect <1:1|3:4|4:3|9:16|16:9>", "set the aspect ratio"),
    ("/detail <standard|high|ultra>", "set the detail level"),
    ("/labels [on|off]", "toggle numbered labels"),
    ("/kid [on|off]", "toggle kid-friendly anatomy"),
    ("/photo <path>", "load a reference photo and analyze it"),
    ("/hint <text>", "set the photo-mode hint"),
    ("/preset <id|title>", "apply a preset"),
    ("/presets", "list presets"),
    ("/generate", "generate the exploded view"),
    ("/prompt", "show the resolved prompt"),
    ("/parts", "list parts of the current result"),
    ("/history", "list generated results, newest first"),
    ("/stats", "show history analytics"),
    ("/delete <id>", "remove a result from history"),
    ("/export <id> [dir]", "write a result image to disk"),
    ("/connect <api-key>", "authenticate with the generation service"),
    ("/quit", "leave the studio"),
];
