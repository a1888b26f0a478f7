use std::fmt;

/// IMEから届いた候補リストと現在のページ
///
/// `selected` はページ内ではなく `items` 全体に対する絶対インデックス。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePage {
    items: Vec<String>,
    page_start: usize,
    page_size: usize,
    selected: Option<usize>,
}

/// 表示対象の候補1件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateEntry<'a> {
    /// `items` 内の絶対インデックス
    pub index: usize,
    /// ページ内の1始まり番号
    pub ordinal: usize,
    pub text: &'a str,
    pub highlighted: bool,
}

impl CandidateEntry<'_> {
    /// "1.候補" 形式の表示ラベル
    pub fn label(&self) -> String {
        format!("{}.{}", self.ordinal, self.text)
    }
}

impl CandidatePage {
    pub fn new(
        items: Vec<String>,
        page_start: usize,
        page_size: usize,
        selected: Option<usize>,
    ) -> Self {
        Self {
            items,
            page_start,
            page_size,
            selected,
        }
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn page_start(&self) -> usize {
        self.page_start
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn page_count(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.items.len().div_ceil(self.page_size)
    }

    pub fn current_page(&self) -> usize {
        if self.page_size == 0 {
            return 0;
        }
        self.page_start / self.page_size
    }

    /// `[page_start, page_start + page_size)` を `items` の長さで切り詰めた範囲
    pub fn visible(&self) -> impl Iterator<Item = CandidateEntry<'_>> + '_ {
        let len = self.items.len();
        let start = self.page_start.min(len);
        let end = self.page_start.saturating_add(self.page_size).min(len);

        self.items[start..end]
            .iter()
            .enumerate()
            .map(move |(offset, text)| {
                let index = start + offset;
                CandidateEntry {
                    index,
                    ordinal: offset + 1,
                    text: text.as_str(),
                    highlighted: self.selected == Some(index),
                }
            })
    }

    /// 表示中の候補を順に描画する。1件の失敗で残りを中断しない。
    ///
    /// 描画できた件数を返す。
    pub fn render_each<E, F>(&self, mut draw: F) -> usize
    where
        E: fmt::Display,
        F: FnMut(&CandidateEntry<'_>) -> Result<(), E>,
    {
        let mut drawn = 0;
        for entry in self.visible() {
            match draw(&entry) {
                Ok(()) => drawn += 1,
                Err(e) => {
                    log::warn!("skip candidate #{} ({:?}): {}", entry.index, entry.text, e);
                }
            }
        }
        drawn
    }
}
