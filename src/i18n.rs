//! Localized strings for the default prompt.
//!
//! Only consumed when no custom prompter or button label is supplied.

/// Strings for one language.
#[derive(Debug)]
pub struct Translations {
    /// Language code this table belongs to.
    pub code: &'static str,
    prompt_one: &'static str,
    prompt_many: &'static str,
    /// Default label for channel subscription buttons.
    pub button_label_channel: &'static str,
    /// Default label for start-bot buttons.
    pub button_label_bot: &'static str,
}

impl Translations {
    /// Prompt text, pluralized on the number of unmet tasks.
    #[must_use]
    pub fn prompt_text(&self, count: usize) -> &'static str {
        if count == 1 {
            self.prompt_one
        } else {
            self.prompt_many
        }
    }
}

/// Keys accepted by [`t`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationKey {
    /// Prompt text; uses the count.
    PromptText,
    /// Channel button label.
    ButtonLabelChannel,
    /// Bot button label.
    ButtonLabelBot,
}

const EN: Translations = Translations {
    code: "en",
    prompt_one: "Please complete the task to continue.",
    prompt_many: "Please complete the tasks to continue.",
    button_label_channel: "Subscribe to channel",
    button_label_bot: "Start bot",
};

static TRANSLATIONS: &[Translations] = &[
    EN,
    Translations {
        code: "ru",
        prompt_one: "Пожалуйста, выполните задание, чтобы продолжить.",
        prompt_many: "Пожалуйста, выполните задания, чтобы продолжить.",
        button_label_channel: "Подписаться на канал",
        button_label_bot: "Запустить бота",
    },
    Translations {
        code: "es",
        prompt_one: "Por favor, complete la tarea para continuar.",
        prompt_many: "Por favor, complete las tareas para continuar.",
        button_label_channel: "Suscribirse al canal",
        button_label_bot: "Iniciar bot",
    },
    Translations {
        code: "de",
        prompt_one: "Bitte erledigen Sie die Aufgabe, um fortzufahren.",
        prompt_many: "Bitte erledigen Sie die Aufgaben, um fortzufahren.",
        button_label_channel: "Kanal abonnieren",
        button_label_bot: "Bot starten",
    },
    Translations {
        code: "fr",
        prompt_one: "Veuillez compléter la tâche pour continuer.",
        prompt_many: "Veuillez compléter les tâches pour continuer.",
        button_label_channel: "S'abonner à la chaîne",
        button_label_bot: "Démarrer le bot",
    },
    Translations {
        code: "it",
        prompt_one: "Per favore, completa il compito per continuare.",
        prompt_many: "Per favore, completa i compiti per continuare.",
        button_label_channel: "Iscriviti al canale",
        button_label_bot: "Avvia bot",
    },
    Translations {
        code: "pt",
        prompt_one: "Por favor, complete a tarefa para continuar.",
        prompt_many: "Por favor, complete as tarefas para continuar.",
        button_label_channel: "Inscrever-se no canal",
        button_label_bot: "Iniciar bot",
    },
    Translations {
        code: "ar",
        prompt_one: "يرجى إكمال المهمة للمتابعة.",
        prompt_many: "يرجى إكمال المهام للمتابعة.",
        button_label_channel: "الاشتراك في القناة",
        button_label_bot: "بدء البوت",
    },
    Translations {
        code: "zh",
        prompt_one: "请完成任务以继续。",
        prompt_many: "请完成任务以继续。",
        button_label_channel: "订阅频道",
        button_label_bot: "启动机器人",
    },
    Translations {
        code: "ja",
        prompt_one: "続行するには、タスクを完了してください。",
        prompt_many: "続行するには、タスクを完了してください。",
        button_label_channel: "チャンネルに登録",
        button_label_bot: "ボットを開始",
    },
    Translations {
        code: "ko",
        prompt_one: "계속하려면 작업을 완료하세요.",
        prompt_many: "계속하려면 작업을 완료하세요.",
        button_label_channel: "채널 구독",
        button_label_bot: "봇 시작",
    },
    Translations {
        code: "tr",
        prompt_one: "Devam etmek için görevi tamamlayın.",
        prompt_many: "Devam etmek için görevleri tamamlayın.",
        button_label_channel: "Kanala abone ol",
        button_label_bot: "Botu başlat",
    },
    Translations {
        code: "uk",
        prompt_one: "Будь ласка, виконайте завдання, щоб продовжити.",
        prompt_many: "Будь ласка, виконайте завдання, щоб продовжити.",
        button_label_channel: "Підписатися на канал",
        button_label_bot: "Запустити бота",
    },
    Translations {
        code: "pl",
        prompt_one: "Proszę ukończyć zadanie, aby kontynuować.",
        prompt_many: "Proszę ukończyć zadania, aby kontynuować.",
        button_label_channel: "Subskrybuj kanał",
        button_label_bot: "Uruchom bota",
    },
    Translations {
        code: "hi",
        prompt_one: "कृपया कार्य पूरा करें ताकि आप जारी रख सकें।",
        prompt_many: "कृपया कार्य पूरा करें ताकि आप जारी रख सकें।",
        button_label_channel: "चैनल सब्सक्राइब करें",
        button_label_bot: "बॉट शुरू करें",
    },
    Translations {
        code: "id",
        prompt_one: "Silakan selesaikan tugas untuk melanjutkan.",
        prompt_many: "Silakan selesaikan tugas untuk melanjutkan.",
        button_label_channel: "Berlangganan saluran",
        button_label_bot: "Mulai bot",
    },
    Translations {
        code: "vi",
        prompt_one: "Vui lòng hoàn thành nhiệm vụ để tiếp tục.",
        prompt_many: "Vui lòng hoàn thành nhiệm vụ để tiếp tục.",
        button_label_channel: "Đăng ký kênh",
        button_label_bot: "Khởi động bot",
    },
    Translations {
        code: "th",
        prompt_one: "กรุณาทำงานให้เสร็จเพื่อดำเนินการต่อ",
        prompt_many: "กรุณาทำงานให้เสร็จเพื่อดำเนินการต่อ",
        button_label_channel: "สมัครสมาชิกช่อง",
        button_label_bot: "เริ่มบอท",
    },
];

/// Primary language subtag, lowercased. Defaults to `en`.
fn primary_subtag(language_code: Option<&str>) -> String {
    language_code
        .and_then(|code| code.split(['_', '-']).next())
        .filter(|code| !code.is_empty())
        .map_or_else(|| "en".to_string(), str::to_lowercase)
}

/// Look up the strings for a language tag, falling back to English.
#[must_use]
pub fn translation(language_code: Option<&str>) -> &'static Translations {
    let code = primary_subtag(language_code);
    TRANSLATIONS
        .iter()
        .find(|tr| tr.code == code)
        .unwrap_or(&EN)
}

/// Look up a single string by key. `count` is only used for the prompt text.
#[must_use]
pub fn t(key: TranslationKey, language_code: Option<&str>, count: usize) -> &'static str {
    let tr = translation(language_code);
    match key {
        TranslationKey::PromptText => tr.prompt_text(count),
        TranslationKey::ButtonLabelChannel => tr.button_label_channel,
        TranslationKey::ButtonLabelBot => tr.button_label_bot,
    }
}
