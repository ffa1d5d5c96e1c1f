use crate::utils::storage::{KeyValueStore, StorageHandle, LANGUAGE_KEY};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Language {
    #[default]
    Ru,
    En,
}

impl Language {
    pub fn code(self) -> &'static str {
        match self {
            Language::Ru => "ru",
            Language::En => "en",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ru" => Some(Language::Ru),
            "en" => Some(Language::En),
            _ => None,
        }
    }
}

/// Looks `key` up for `language`; unknown keys come back unchanged.
pub fn translate<'a>(language: Language, key: &'a str) -> &'a str {
    let table = match language {
        Language::Ru => RU,
        Language::En => EN,
    };
    table
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
        .unwrap_or(key)
}

/// Persisted language choice, `ru` unless something valid is stored.
#[derive(Clone, PartialEq)]
pub struct LanguagePreference {
    storage: StorageHandle,
}

impl LanguagePreference {
    pub fn new(storage: StorageHandle) -> Self {
        Self { storage }
    }

    pub fn load(&self) -> Language {
        self.storage
            .get(LANGUAGE_KEY)
            .and_then(|code| Language::from_code(&code))
            .unwrap_or_default()
    }

    pub fn save(&self, language: Language) {
        if let Err(e) = self.storage.set(LANGUAGE_KEY, language.code()) {
            log::warn!("Could not persist language: {}", e);
        }
    }
}

const RU: &[(&str, &str)] = &[
    ("home", "Главная"),
    ("features", "Возможности"),
    ("pricing", "Тарифы"),
    ("faq", "FAQ"),
    ("contacts", "Контакты"),
    ("settings", "Настройки"),
    ("login", "Войти"),
    ("logout", "Выйти"),
    ("hero_title", "Автоматизация бизнеса через Telegram боты"),
    ("hero_subtitle", "YAPPERTAR AI — платформа для создания интеллектуальных чат-ботов, которые автоматизируют ваши бизнес-процессы и повышают эффективность команды"),
    ("get_started", "Попробовать бесплатно"),
    ("watch_demo", "Демо"),
    ("features_title", "Возможности платформы"),
    ("features_subtitle", "Полный набор инструментов для создания и управления чат-ботами"),
    ("feature1_title", "Интеллектуальные диалоги"),
    ("feature1_desc", "Боты понимают контекст и дают точные ответы благодаря ИИ"),
    ("feature2_title", "Интеграция с системами"),
    ("feature2_desc", "Подключение к CRM, базам данных и внешним API"),
    ("feature3_title", "Аналитика в реальном времени"),
    ("feature3_desc", "Отслеживайте метрики и поведение пользователей"),
    ("pricing_title", "Тарифные планы"),
    ("pricing_subtitle", "Выберите план, который подходит именно вам"),
    ("starter", "Стартер"),
    ("starter_desc", "Для небольших проектов"),
    ("professional", "Профессиональный"),
    ("professional_desc", "Для растущего бизнеса"),
    ("enterprise", "Корпоративный"),
    ("enterprise_desc", "Для крупных компаний"),
    ("month", "/мес"),
    ("choose_plan", "Выбрать план"),
    ("current_plan", "Текущий план"),
    ("faq_title", "Часто задаваемые вопросы"),
    ("faq_subtitle", "Ответы на популярные вопросы о нашем сервисе"),
    ("faq1_q", "Как быстро можно запустить первого бота?"),
    ("faq1_a", "Создание базового бота занимает 5-10 минут. Вы можете использовать готовые шаблоны для типовых сценариев или настроить бота под свои задачи с помощью визуального конструктора."),
    ("faq2_q", "Нужны ли навыки программирования?"),
    ("faq2_a", "Нет, базовые сценарии настраиваются без кода через визуальный интерфейс. Для сложных интеграций доступен API и возможность написания кастомных функций на Python или JavaScript."),
    ("faq3_q", "Какие интеграции поддерживаются?"),
    ("faq3_a", "Платформа поддерживает интеграцию с популярными CRM (Битрикс24, amoCRM), платёжными системами (ЮKassa, Stripe), Google Sheets, базами данных и любыми сервисами с REST API."),
    ("faq4_q", "Как работает ИИ-ассистент?"),
    ("faq4_a", "ИИ обучается на вашей базе знаний и автоматически отвечает на вопросы пользователей. Вы можете загрузить FAQ, документацию или другие материалы, и бот будет использовать их для генерации ответов."),
    ("faq5_q", "Есть ли ограничения по количеству пользователей?"),
    ("faq5_a", "В базовом тарифе — до 1000 активных пользователей в месяц. Для корпоративных клиентов предусмотрены индивидуальные тарифы без ограничений с выделенной инфраструктурой."),
    ("faq6_q", "Как защищены данные пользователей?"),
    ("faq6_a", "Все данные шифруются по стандарту AES-256. Мы соответствуем требованиям GDPR, храним данные в ЕС и России. Доступна функция автоматического удаления персональных данных по запросу."),
    ("contacts_title", "Свяжитесь с нами"),
    ("contacts_subtitle", "Готовы начать? Напишите нам для консультации"),
    ("email", "Email"),
    ("telegram", "Telegram"),
    ("request_demo", "Заказать демонстрацию"),
    ("rights_reserved", "Все права защищены."),
    ("settings_title", "Настройки"),
    ("settings_subtitle", "Настройте внешний вид и язык интерфейса"),
    ("theme", "Тема"),
    ("light_theme", "Светлая"),
    ("dark_theme", "Тёмная"),
    ("language_label", "Язык"),
    ("russian", "Русский"),
    ("english", "English"),
    ("save_settings", "Сохранить"),
    ("password", "Пароль"),
    ("confirm_password", "Повторите пароль"),
    ("auth_login_title", "Вход в систему"),
    ("auth_register_title", "Регистрация"),
    ("auth_subtitle", "Введите email и пароль для доступа"),
    ("register", "Зарегистрироваться"),
    ("switch_to_register", "Нет аккаунта? Зарегистрироваться"),
    ("switch_to_login", "Уже есть аккаунт? Войти"),
    ("or_continue_with", "Или войдите через"),
    ("loading", "Загрузка..."),
    ("secure_connection", "Защищённое соединение"),
    ("login_success", "Вход выполнен успешно!"),
    ("error_empty_fields", "Заполните все поля"),
    ("error_password_mismatch", "Пароли не совпадают"),
    ("error_password_too_short", "Пароль должен содержать не менее 6 символов"),
    ("error_captcha_missing", "Не удалось пройти проверку reCAPTCHA"),
    ("error_network", "Ошибка сети. Проверьте подключение"),
    ("error_server", "Ошибка авторизации"),
    ("error_popup_blocked", "Браузер заблокировал всплывающее окно"),
    ("error_popup_closed", "Окно входа было закрыто"),
    ("not_found_title", "Страница не найдена"),
    ("back_home", "На главную"),
];

const EN: &[(&str, &str)] = &[
    ("home", "Home"),
    ("features", "Features"),
    ("pricing", "Pricing"),
    ("faq", "FAQ"),
    ("contacts", "Contacts"),
    ("settings", "Settings"),
    ("login", "Login"),
    ("logout", "Logout"),
    ("hero_title", "Business Automation via Telegram Bots"),
    ("hero_subtitle", "YAPPERTAR AI is a platform for creating intelligent chatbots that automate your business processes and increase team efficiency"),
    ("get_started", "Try for Free"),
    ("watch_demo", "Demo"),
    ("features_title", "Platform Features"),
    ("features_subtitle", "Complete toolkit for creating and managing chatbots"),
    ("feature1_title", "Intelligent Conversations"),
    ("feature1_desc", "Bots understand context and provide accurate answers with AI"),
    ("feature2_title", "System Integration"),
    ("feature2_desc", "Connect to CRM, databases and external APIs"),
    ("feature3_title", "Real-time Analytics"),
    ("feature3_desc", "Track metrics and user behavior"),
    ("pricing_title", "Pricing Plans"),
    ("pricing_subtitle", "Choose the plan that fits you best"),
    ("starter", "Starter"),
    ("starter_desc", "For small projects"),
    ("professional", "Professional"),
    ("professional_desc", "For growing business"),
    ("enterprise", "Enterprise"),
    ("enterprise_desc", "For large companies"),
    ("month", "/mo"),
    ("choose_plan", "Choose Plan"),
    ("current_plan", "Current Plan"),
    ("faq_title", "Frequently Asked Questions"),
    ("faq_subtitle", "Answers to popular questions about our service"),
    ("faq1_q", "How quickly can I launch my first bot?"),
    ("faq1_a", "A basic bot takes 5-10 minutes. Start from a ready-made template for common scenarios or tailor the bot to your tasks in the visual builder."),
    ("faq2_q", "Do I need programming skills?"),
    ("faq2_a", "No, basic scenarios are configured without code in the visual interface. Complex integrations can use the API and custom functions in Python or JavaScript."),
    ("faq3_q", "Which integrations are supported?"),
    ("faq3_a", "The platform integrates with popular CRMs (Bitrix24, amoCRM), payment systems (YooKassa, Stripe), Google Sheets, databases and any service with a REST API."),
    ("faq4_q", "How does the AI assistant work?"),
    ("faq4_a", "The AI learns from your knowledge base and answers user questions automatically. Upload an FAQ, documentation or other material and the bot will use it to generate answers."),
    ("faq5_q", "Is there a limit on the number of users?"),
    ("faq5_a", "The basic plan covers up to 1000 active users per month. Enterprise customers get individual plans without limits on dedicated infrastructure."),
    ("faq6_q", "How is user data protected?"),
    ("faq6_a", "All data is encrypted with AES-256. We comply with GDPR and store data in the EU and Russia. Personal data can be deleted automatically on request."),
    ("contacts_title", "Contact Us"),
    ("contacts_subtitle", "Ready to start? Write to us for consultation"),
    ("email", "Email"),
    ("telegram", "Telegram"),
    ("request_demo", "Request Demo"),
    ("rights_reserved", "All rights reserved."),
    ("settings_title", "Settings"),
    ("settings_subtitle", "Customize appearance and interface language"),
    ("theme", "Theme"),
    ("light_theme", "Light"),
    ("dark_theme", "Dark"),
    ("language_label", "Language"),
    ("russian", "Русский"),
    ("english", "English"),
    ("save_settings", "Save"),
    ("password", "Password"),
    ("confirm_password", "Confirm password"),
    ("auth_login_title", "Sign In"),
    ("auth_register_title", "Sign Up"),
    ("auth_subtitle", "Enter your email and password to continue"),
    ("register", "Sign Up"),
    ("switch_to_register", "No account? Sign up"),
    ("switch_to_login", "Already have an account? Sign in"),
    ("or_continue_with", "Or continue with"),
    ("loading", "Loading..."),
    ("secure_connection", "Secure connection"),
    ("login_success", "Signed in successfully!"),
    ("error_empty_fields", "Please fill in all fields"),
    ("error_password_mismatch", "Passwords do not match"),
    ("error_password_too_short", "Password must be at least 6 characters"),
    ("error_captcha_missing", "reCAPTCHA check did not complete"),
    ("error_network", "Network error. Check your connection"),
    ("error_server", "Authentication failed"),
    ("error_popup_blocked", "The browser blocked the sign-in popup"),
    ("error_popup_closed", "The sign-in window was closed"),
    ("not_found_title", "Page not found"),
    ("back_home", "Back to home"),
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use crate::utils::storage::MemoryStorage;

    fn preference() -> (LanguagePreference, MemoryStorage) {
        let store = MemoryStorage::new();
        (LanguagePreference::new(StorageHandle(Rc::new(store.clone()))), store)
    }

    #[test]
    fn known_keys_resolve_per_language() {
        assert_eq!(translate(Language::Ru, "login"), "Войти");
        assert_eq!(translate(Language::En, "login"), "Login");
        assert_eq!(translate(Language::En, "month"), "/mo");
    }

    #[test]
    fn unknown_key_is_returned_unchanged() {
        assert_eq!(translate(Language::Ru, "no_such_key"), "no_such_key");
        assert_eq!(translate(Language::En, ""), "");
    }

    #[test]
    fn both_tables_have_the_same_keys() {
        let mut ru: Vec<_> = RU.iter().map(|(k, _)| *k).collect();
        let mut en: Vec<_> = EN.iter().map(|(k, _)| *k).collect();
        ru.sort_unstable();
        en.sort_unstable();
        assert_eq!(ru, en);
    }

    #[test]
    fn missing_or_garbage_preference_defaults_to_russian() {
        let (pref, store) = preference();
        assert_eq!(pref.load(), Language::Ru);
        store.set(LANGUAGE_KEY, "de").unwrap();
        assert_eq!(pref.load(), Language::Ru);
    }

    #[test]
    fn saved_language_is_read_back() {
        let (pref, store) = preference();
        pref.save(Language::En);
        assert_eq!(store.get(LANGUAGE_KEY).as_deref(), Some("en"));
        assert_eq!(pref.load(), Language::En);
    }
}
