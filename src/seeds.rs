//! Built-in corpus. Guarantees every section is usable without a config file.

use std::collections::HashMap;

use crate::domain::{AnswerPair, Corpus, Domain, Passage, Probe, ProbeOption, Rule};

fn pair(id: &str, question: &str, answer: &str, arabic: Option<&str>) -> AnswerPair {
  AnswerPair { id: id.into(), question: question.into(), answer: answer.into(), arabic: arabic.map(String::from) }
}

fn passage(id: &str, name: &str, ar: &str, tr: Option<&str>, translation: Option<&str>, content: Option<&str>) -> Passage {
  Passage {
    id: id.into(),
    name: name.into(),
    ar: ar.into(),
    tr: tr.map(String::from),
    translation: translation.map(String::from),
    content: content.map(String::from),
  }
}

fn rule(id: &str, title: &str, content: &str) -> Rule {
  Rule { id: id.into(), title: title.into(), content: content.into() }
}

fn probe(text: &str, options: &[(&str, bool)]) -> Probe {
  Probe {
    text: text.into(),
    options: options
      .iter()
      .enumerate()
      .map(|(i, (t, ok))| ProbeOption { id: format!("o{}", i + 1), text: (*t).into(), is_correct: *ok })
      .collect(),
  }
}

pub fn seed_fiqh() -> Vec<AnswerPair> {
  vec![
    pair("fiqh-1", "How many obligatory prayers are there in a day?", "Five", Some("خَمْسُ صَلَوَاتٍ")),
    pair("fiqh-2", "What is the minimum number of rak'ahs in the Fajr prayer?", "Two", None),
    pair("fiqh-3", "Which act removes minor ritual impurity?", "Wudu (ablution)", Some("الوُضُوء")),
    pair("fiqh-4", "What may be used for purification when no water is available?", "Clean earth (tayammum)", Some("التَّيَمُّم")),
    pair("fiqh-5", "In which month is fasting obligatory?", "Ramadan", Some("رَمَضَان")),
    pair("fiqh-6", "What is the share of zakat on savings that reached the nisab for a year?", "One fortieth (2.5%)", None),
  ]
}

pub fn seed_surahs() -> Vec<Passage> {
  vec![
    passage(
      "surah-1",
      "Al-Fatiha",
      "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ الْحَمْدُ لِلَّهِ رَبِّ الْعَالَمِينَ الرَّحْمَنِ الرَّحِيمِ مَالِكِ يَوْمِ الدِّينِ",
      Some("Bismillahi r-rahmani r-rahim. Al-hamdu lillahi rabbi l-'alamin"),
      Some("The Opening"),
      None,
    ),
    passage(
      "surah-112",
      "Al-Ikhlas",
      "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ قُلْ هُوَ اللَّهُ أَحَدٌ اللَّهُ الصَّمَدُ لَمْ يَلِدْ وَلَمْ يُولَدْ وَلَمْ يَكُنْ لَهُ كُفُوًا أَحَدٌ",
      Some("Qul huwa Allahu ahad"),
      Some("Sincerity"),
      None,
    ),
    passage(
      "surah-113",
      "Al-Falaq",
      "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ قُلْ أَعُوذُ بِرَبِّ الْفَلَقِ مِنْ شَرِّ مَا خَلَقَ وَمِنْ شَرِّ غَاسِقٍ إِذَا وَقَبَ",
      Some("Qul a'udhu bi-rabbi l-falaq"),
      Some("The Daybreak"),
      None,
    ),
    passage(
      "surah-114",
      "An-Nas",
      "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ قُلْ أَعُوذُ بِرَبِّ النَّاسِ مَلِكِ النَّاسِ إِلَهِ النَّاسِ مِنْ شَرِّ الْوَسْوَاسِ الْخَنَّاسِ",
      Some("Qul a'udhu bi-rabbi n-nas"),
      Some("Mankind"),
      None,
    ),
    passage(
      "surah-108",
      "Al-Kawthar",
      "بِسْمِ اللَّهِ الرَّحْمَنِ الرَّحِيمِ إِنَّا أَعْطَيْنَاكَ الْكَوْثَرَ فَصَلِّ لِرَبِّكَ وَانْحَرْ إِنَّ شَانِئَكَ هُوَ الْأَبْتَرُ",
      Some("Inna a'taynaka l-kawthar"),
      None,
      None,
    ),
  ]
}

pub fn seed_azkars() -> Vec<Passage> {
  let morning = [
    "أَصْبَحْنَا وَأَصْبَحَ الْمُلْكُ لِلَّهِ وَالْحَمْدُ لِلَّهِ",
    "اللَّهُمَّ بِكَ أَصْبَحْنَا وَبِكَ أَمْسَيْنَا وَبِكَ نَحْيَا وَبِكَ نَمُوتُ وَإِلَيْكَ النُّشُورُ",
  ];
  let evening = [
    "أَمْسَيْنَا وَأَمْسَى الْمُلْكُ لِلَّهِ وَالْحَمْدُ لِلَّهِ",
    "اللَّهُمَّ بِكَ أَمْسَيْنَا وَبِكَ أَصْبَحْنَا وَبِكَ نَحْيَا وَبِكَ نَمُوتُ وَإِلَيْكَ الْمَصِيرُ",
  ];
  let mut out = Vec::new();
  for (i, ar) in morning.iter().enumerate() {
    out.push(passage(&format!("azkar-m{}", i + 1), &format!("Morning dhikr #{}", i + 1), ar, None, None, None));
  }
  for (i, ar) in evening.iter().enumerate() {
    out.push(passage(&format!("azkar-e{}", i + 1), &format!("Evening dhikr #{}", i + 1), ar, None, None, None));
  }
  out
}

pub fn seed_duas() -> Vec<Passage> {
  vec![
    passage(
      "dua-1",
      "Before sleeping",
      "بِاسْمِكَ اللَّهُمَّ أَمُوتُ وَأَحْيَا",
      Some("Bismika Allahumma amutu wa ahya"),
      None,
      Some("In Your name, O Allah, I die and I live."),
    ),
    passage(
      "dua-2",
      "On waking up",
      "الْحَمْدُ لِلَّهِ الَّذِي أَحْيَانَا بَعْدَ مَا أَمَاتَنَا وَإِلَيْهِ النُّشُورُ",
      Some("Al-hamdu lillahi lladhi ahyana ba'da ma amatana wa ilayhi n-nushur"),
      None,
      Some("Praise be to Allah who gave us life after He caused us to die, and to Him is the return."),
    ),
    passage(
      "dua-3",
      "Leaving the house",
      "بِسْمِ اللَّهِ تَوَكَّلْتُ عَلَى اللَّهِ وَلَا حَوْلَ وَلَا قُوَّةَ إِلَّا بِاللَّهِ",
      Some("Bismillah, tawakkaltu 'ala Allah, wa la hawla wa la quwwata illa billah"),
      None,
      Some("In the name of Allah, I rely upon Allah; there is no might nor power except with Allah."),
    ),
  ]
}

pub fn seed_tajweed() -> Vec<Rule> {
  vec![
    rule("tajweed-1", "Izhar", "Pronouncing noon sakinah or tanween clearly before the throat letters."),
    rule("tajweed-2", "Idgham", "Merging noon sakinah or tanween into the following letter of يرملون."),
    rule("tajweed-3", "Iqlab", "Turning noon sakinah or tanween into a hidden meem before the letter ب."),
    rule("tajweed-4", "Ikhfa", "Hiding noon sakinah or tanween with ghunnah before the remaining fifteen letters."),
    rule("tajweed-5", "Qalqalah", "Echoing the letters قطب جد when they carry a sukoon."),
  ]
}

pub fn seed_probes() -> HashMap<Domain, Probe> {
  HashMap::from([
    (
      Domain::Azkars,
      probe(
        "When is the time for the morning adhkar?",
        &[
          ("From dawn until sunrise", true),
          ("After the night prayer", false),
          ("Only on Fridays", false),
          ("Before sleeping", false),
        ],
      ),
    ),
    (
      Domain::Duas,
      probe(
        "What is said before entering the house?",
        &[
          ("Bismillah", true),
          ("Subhan Allah", false),
          ("Allahu Akbar", false),
          ("Astaghfirullah", false),
        ],
      ),
    ),
  ])
}

/// The complete built-in corpus.
pub fn seed_corpus() -> Corpus {
  Corpus {
    azkars: seed_azkars(),
    surahs: seed_surahs(),
    duas: seed_duas(),
    fiqh: seed_fiqh(),
    tajweed: seed_tajweed(),
    probes: seed_probes(),
  }
}

/// Returned when the study-plan generator is unavailable or replies garbage.
pub fn fallback_study_plan() -> Vec<String> {
  vec![
    "Learn one morning and one evening dhikr every two days".into(),
    "Go through three fiqh questions a week".into(),
    "Memorize one new surah every two weeks".into(),
    "Review the tajweed rules on weekends".into(),
  ]
}
