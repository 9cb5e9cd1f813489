use i18n_embed::DesktopLanguageRequester;
use std::collections::HashMap;
use unic_langid::{langid, LanguageIdentifier};

// Simple in-memory translations
#[derive(Default)]
pub struct Translations {
    strings: HashMap<&'static str, &'static str>,
}

impl Translations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: &'static str) {
        self.strings.insert(key, value);
    }

    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        self.strings.get(key).copied()
    }
}

fn english() -> Translations {
    let mut en = Translations::new();
    en.insert("app-title", "YouTube Downloader");
    en.insert("app-subtitle", "A simple, minimal and high quality youtube downloader.");
    en.insert("download-button", "Download");
    en.insert("cancel-button", "Cancel");
    en.insert("update-button", "Update yt-dlp");
    en.insert("mode-single", "Single");
    en.insert("mode-batch", "Batch");
    en.insert("url-label", "Video URL:");
    en.insert("url-placeholder", "Enter video URL");
    en.insert("batch-label", "URLs (one per line):");
    en.insert("download-format", "Download as:");
    en.insert("format-best", "Best Quality (auto)");
    en.insert("format-video", "Best Video");
    en.insert("format-audio", "Best Audio");
    en.insert("container-label", "Container");
    en.insert("quality-label", "Quality");
    en.insert("audio-format-label", "Format");
    en.insert("download-to", "Download to:");
    en.insert("browse-button", "Browse...");
    en.insert("open-folder-button", "Open folder");
    en.insert("no-folder", "No folder selected");
    en.insert("options-label", "More options");
    en.insert("embed-subtitles", "Embed Subtitles");
    en.insert("subtitle-languages", "Subtitle languages");
    en.insert("embed-metadata", "Embed Metadata");
    en.insert("skip-existing", "Skip Existing");
    en.insert("auto-open", "Auto Open Folder");
    en.insert("speed-limit", "Speed limit (e.g. 1M)");
    en.insert("throttle-rate", "Throttled rate (e.g. 100K)");
    en.insert("filename-template", "Filename template");
    en.insert("status-ready", "Ready");
    en.insert("status-checking", "Checking dependencies...");
    en.insert("status-downloading", "Downloading:");
    en.insert("status-updating", "Updating yt-dlp...");
    en.insert("log-label", "Log");
    en.insert("error-title", "Error");
    en.insert("ok-button", "OK");
    en
}

fn spanish() -> Translations {
    let mut es = Translations::new();
    es.insert("app-title", "Descargador de YouTube");
    es.insert("app-subtitle", "Un descargador de YouTube simple, minimalista y de alta calidad.");
    es.insert("download-button", "Descargar");
    es.insert("cancel-button", "Cancelar");
    es.insert("update-button", "Actualizar yt-dlp");
    es.insert("mode-single", "Una");
    es.insert("mode-batch", "Lote");
    es.insert("url-label", "URL del video:");
    es.insert("url-placeholder", "Ingrese la URL del video");
    es.insert("batch-label", "URLs (una por línea):");
    es.insert("download-format", "Descargar como:");
    es.insert("format-best", "Mejor calidad (auto)");
    es.insert("format-video", "Mejor video");
    es.insert("format-audio", "Mejor audio");
    es.insert("container-label", "Contenedor");
    es.insert("quality-label", "Calidad");
    es.insert("audio-format-label", "Formato");
    es.insert("download-to", "Descargar en:");
    es.insert("browse-button", "Examinar...");
    es.insert("open-folder-button", "Abrir carpeta");
    es.insert("no-folder", "Ninguna carpeta seleccionada");
    es.insert("options-label", "Más opciones");
    es.insert("embed-subtitles", "Incrustar subtítulos");
    es.insert("subtitle-languages", "Idiomas de subtítulos");
    es.insert("embed-metadata", "Incrustar metadatos");
    es.insert("skip-existing", "Omitir existentes");
    es.insert("auto-open", "Abrir carpeta al terminar");
    es.insert("speed-limit", "Límite de velocidad (ej. 1M)");
    es.insert("throttle-rate", "Tasa mínima (ej. 100K)");
    es.insert("filename-template", "Plantilla de nombre");
    es.insert("status-ready", "Listo");
    es.insert("status-checking", "Comprobando dependencias...");
    es.insert("status-downloading", "Descargando:");
    es.insert("status-updating", "Actualizando yt-dlp...");
    es.insert("log-label", "Registro");
    es.insert("error-title", "Error");
    es.insert("ok-button", "Aceptar");
    es
}

pub struct Localizations {
    translations: HashMap<LanguageIdentifier, Translations>,
    current_lang: LanguageIdentifier,
}

impl Default for Localizations {
    fn default() -> Self {
        Self::new()
    }
}

impl Localizations {
    /// Tables for every supported language, with the desktop's preferred
    /// language selected.
    pub fn new() -> Self {
        let mut localizer = Self::english_only();
        localizer
            .translations
            .insert(langid!("es-ES"), spanish());

        let requested = DesktopLanguageRequester::requested_languages();
        if let Some(lang) = requested.iter().find(|lang| localizer.supports(lang)) {
            localizer.select(lang);
        }
        localizer
    }

    fn english_only() -> Self {
        let mut translations = HashMap::new();
        translations.insert(langid!("en-US"), english());
        Self {
            translations,
            current_lang: langid!("en-US"),
        }
    }

    fn supports(&self, lang: &LanguageIdentifier) -> bool {
        self.translations
            .keys()
            .any(|key| key.language == lang.language)
    }

    /// Switches to `lang`, matching on the language subtag when the region
    /// differs. Unknown languages fall back to English.
    pub fn select(&mut self, lang: &LanguageIdentifier) {
        let matched = if self.translations.contains_key(lang) {
            Some(lang.clone())
        } else {
            self.translations
                .keys()
                .find(|key| key.language == lang.language)
                .cloned()
        };
        self.current_lang = matched.unwrap_or_else(|| langid!("en-US"));
    }

    pub fn current(&self) -> &LanguageIdentifier {
        &self.current_lang
    }

    pub fn lookup(&self, key: &str) -> Option<&'static str> {
        self.translations
            .get(&self.current_lang)
            .and_then(|t| t.lookup(key))
            .or_else(|| {
                // Fallback to English if the current language doesn't have the key
                self.translations
                    .get(&langid!("en-US"))
                    .and_then(|t| t.lookup(key))
            })
    }

    /// Like [`lookup`](Self::lookup) but never empty: a missing key shows
    /// up as itself.
    pub fn text<'a>(&self, key: &'a str) -> &'a str {
        self.lookup(key).unwrap_or(key)
    }
}
