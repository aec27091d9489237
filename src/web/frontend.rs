//! Embedded HTML/CSS/JS frontend for the trendlens explorer.
//!
//! The page ships inside the binary as one string constant: no external
//! assets, no build tools, no CDN dependencies. The chart
//! itself is rendered server-side; the script here only wires events
//! onto the injected SVG via its data attributes.

/// The complete single-page explorer HTML.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>trendlens Explorer</title>
<style>
:root {
  --bg: #0d1117;
  --surface: #161b22;
  --border: #30363d;
  --text: #e6edf3;
  --text-muted: #8b949e;
  --accent: #58a6ff;
  --green: #3fb950;
  --yellow: #d29922;
  --red: #f85149;
  --radius: 8px;
  --font: -apple-system, BlinkMacSystemFont, 'Segoe UI', Helvetica, Arial, sans-serif;
  --mono: 'SF Mono', 'Cascadia Code', 'Fira Code', monospace;
}

* { margin: 0; padding: 0; box-sizing: border-box; }
body {
  background: var(--bg);
  color: var(--text);
  font-family: var(--font);
  font-size: 14px;
  line-height: 1.5;
}

/* Layout */
.app {
  max-width: 1100px;
  margin: 0 auto;
  padding: 24px;
}

header {
  display: flex;
  align-items: center;
  justify-content: space-between;
  margin-bottom: 24px;
  padding-bottom: 16px;
  border-bottom: 1px solid var(--border);
}

header h1 {
  font-size: 24px;
  font-weight: 600;
  display: flex;
  align-items: center;
  gap: 10px;
}

header h1 .logo {
  color: var(--accent);
  font-family: var(--mono);
  font-weight: 700;
}

header .subtitle {
  color: var(--text-muted);
  font-size: 13px;
}

.health-badges { display: flex; gap: 8px; }

.badge {
  display: inline-flex;
  align-items: center;
  gap: 4px;
  padding: 4px 10px;
  border-radius: 12px;
  font-size: 12px;
  font-weight: 500;
  background: var(--surface);
  border: 1px solid var(--border);
}

.badge.ok { border-color: var(--green); color: var(--green); }
.badge.warn { border-color: var(--yellow); color: var(--yellow); }

/* Cards */
.card {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  margin-bottom: 16px;
}

.card h2 {
  font-size: 16px;
  font-weight: 600;
  margin-bottom: 16px;
  color: var(--text);
}

/* Demo cards */
.demo-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
  gap: 16px;
}

.demo-card {
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 20px;
  text-align: center;
  cursor: pointer;
  transition: all 0.15s;
}

.demo-card:hover { border-color: var(--accent); }
.demo-card.selected { border-color: var(--accent); background: rgba(88,166,255,0.08); }
.demo-card .icon { font-size: 36px; margin-bottom: 8px; }
.demo-card .name { font-weight: 600; }
.demo-card .topics { font-size: 11px; color: var(--text-muted); margin-top: 6px; }

/* Dataset summary */
.stats-grid {
  display: grid;
  grid-template-columns: repeat(auto-fit, minmax(160px, 1fr));
  gap: 16px;
}

.stat-card {
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  padding: 16px;
  text-align: center;
}

.stat-card .value {
  font-size: 26px;
  font-weight: 700;
  font-family: var(--mono);
  color: var(--accent);
  line-height: 1.1;
}

.stat-card .label {
  font-size: 12px;
  color: var(--text-muted);
  margin-top: 6px;
  text-transform: uppercase;
  letter-spacing: 0.5px;
}

/* Controls */
.control-row {
  display: flex;
  align-items: flex-start;
  padding: 8px 0;
  gap: 12px;
}

.control-row label {
  flex: 0 0 180px;
  font-size: 13px;
  color: var(--text);
  padding-top: 6px;
}

.control-row label .desc {
  font-size: 11px;
  color: var(--text-muted);
  display: block;
}

textarea {
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: 6px;
  color: var(--text);
  padding: 8px 10px;
  font-size: 13px;
  font-family: var(--font);
  width: 100%;
  max-width: 540px;
  resize: vertical;
}

textarea:focus { outline: none; border-color: var(--accent); }

input[type="range"] { width: 240px; accent-color: var(--accent); vertical-align: middle; }
.cutoff-value { font-family: var(--mono); color: var(--accent); margin-left: 10px; }

/* Buttons */
.btn {
  display: inline-flex;
  align-items: center;
  gap: 6px;
  padding: 8px 16px;
  border: 1px solid var(--border);
  border-radius: 6px;
  background: var(--surface);
  color: var(--text);
  font-size: 13px;
  cursor: pointer;
  transition: all 0.15s;
}

.btn:hover { border-color: var(--accent); color: var(--accent); }
.btn.primary { background: var(--accent); color: #fff; border-color: var(--accent); }
.btn.primary:hover { opacity: 0.85; }
.btn:disabled { opacity: 0.5; cursor: not-allowed; }

.btn-group { display: flex; gap: 8px; margin-top: 16px; align-items: center; }

/* Chart */
#chart { color: var(--text); }
#chart svg { display: block; }
#chart .marker { cursor: pointer; transition: r 0.1s; }

.chart-tooltip {
  position: absolute;
  background: #24292f;
  border: 1px solid var(--border);
  color: #fff;
  padding: 8px 12px;
  border-radius: 6px;
  font-size: 12px;
  max-width: 300px;
  pointer-events: none;
  opacity: 0;
  transition: opacity 0.15s;
  z-index: 500;
}

.chart-tooltip.show { opacity: 1; }
.chart-tooltip .tt-title { font-weight: 600; margin-bottom: 4px; }
.chart-tooltip .tt-doc { color: #c9d1d9; font-style: italic; }

/* Modal */
.modal-backdrop {
  position: fixed;
  inset: 0;
  background: rgba(0,0,0,0.6);
  display: none;
  align-items: center;
  justify-content: center;
  z-index: 900;
}

.modal-backdrop.show { display: flex; }

.modal {
  background: var(--surface);
  border: 1px solid var(--border);
  border-radius: var(--radius);
  width: min(640px, 90vw);
  max-height: 80vh;
  overflow-y: auto;
  padding: 20px;
}

.modal h2 { margin-bottom: 12px; }
.modal .close { float: right; cursor: pointer; color: var(--text-muted); font-size: 18px; }
.modal .close:hover { color: var(--text); }

.doc-item { padding: 10px 0; border-bottom: 1px solid var(--border); }
.doc-item:last-child { border-bottom: none; }
.doc-item a { color: var(--accent); text-decoration: none; font-weight: 500; }
.doc-item a:hover { text-decoration: underline; }
.doc-item .excerpt { font-size: 12px; color: var(--text-muted); margin-top: 4px; }

/* Interpretation output */
#interp-output {
  background: var(--bg);
  border: 1px solid var(--border);
  border-radius: 6px;
  padding: 16px;
  margin-top: 16px;
  font-size: 13px;
  display: none;
}

#interp-output.show { display: block; }
#interp-output h1, #interp-output h2, #interp-output h3 { font-size: 14px; margin: 10px 0 6px; }
#interp-output p { margin-bottom: 8px; }
#interp-output ul { margin: 0 0 8px 20px; }

/* Toast */
.toast {
  position: fixed;
  bottom: 24px;
  right: 24px;
  padding: 12px 20px;
  border-radius: var(--radius);
  background: var(--green);
  color: #fff;
  font-weight: 500;
  font-size: 13px;
  transform: translateY(80px);
  opacity: 0;
  transition: all 0.3s;
  z-index: 1000;
}

.toast.show { transform: translateY(0); opacity: 1; }
.toast.error { background: var(--red); }

/* Loading */
.spinner {
  display: inline-block;
  width: 16px;
  height: 16px;
  border: 2px solid var(--border);
  border-top-color: var(--accent);
  border-radius: 50%;
  animation: spin 0.6s linear infinite;
  vertical-align: middle;
}

@keyframes spin { to { transform: rotate(360deg); } }

.hidden { display: none; }

@media (max-width: 768px) {
  .control-row { flex-direction: column; }
  .control-row label { flex: none; }
}
</style>
</head>
<body>
<div class="app">

  <!-- Header -->
  <header>
    <div>
      <h1><span class="logo">~ trendlens</span> Explorer</h1>
      <div class="subtitle">Classify documents into topics and watch them trend over time</div>
    </div>
    <div class="health-badges" id="health-badges"></div>
  </header>

  <!-- Demo selection -->
  <div class="card">
    <h2>Datasets</h2>
    <div class="demo-grid" id="demo-grid"><span class="spinner"></span></div>
  </div>

  <!-- Dataset summary -->
  <div class="card hidden" id="dataset-card">
    <h2 id="dataset-title">Dataset</h2>
    <div class="stats-grid">
      <div class="stat-card"><div class="value" id="stat-docs">&#8212;</div><div class="label">Documents</div></div>
      <div class="stat-card"><div class="value" id="stat-from">&#8212;</div><div class="label">From</div></div>
      <div class="stat-card"><div class="value" id="stat-to">&#8212;</div><div class="label">To</div></div>
    </div>
  </div>

  <!-- Topic controls -->
  <div class="card hidden" id="explore-card">
    <h2>Topics</h2>
    <div class="control-row">
      <label>Topics<span class="desc">One per line; documents match the most similar topic</span></label>
      <textarea id="topics-input" rows="5" placeholder="Deep learning&#10;Reinforcement learning&#10;..."></textarea>
    </div>
    <div class="control-row">
      <label>Similarity cutoff<span class="desc">Documents below this score stay unclassified</span></label>
      <div>
        <input type="range" id="cutoff-slider" min="0" max="100" step="1" value="30">
        <span class="cutoff-value" id="cutoff-value">30%</span>
      </div>
    </div>
    <div class="btn-group">
      <button class="btn primary" id="btn-classify">Classify</button>
      <span id="classify-status"></span>
    </div>
  </div>

  <!-- Chart -->
  <div class="card hidden" id="chart-card">
    <h2>Topic Trends</h2>
    <div id="chart"></div>
  </div>

  <!-- Interpretation -->
  <div class="card hidden" id="interp-card">
    <h2>Trend Interpretation</h2>
    <div class="control-row">
      <label>Prompt<span class="desc">System prompt for the analysis</span></label>
      <textarea id="interp-prompt" rows="3"></textarea>
    </div>
    <div class="btn-group">
      <button class="btn primary" id="btn-interpret">Interpret Trend</button>
      <span id="interp-status"></span>
    </div>
    <div id="interp-output"></div>
  </div>

</div>

<!-- Hover tooltip -->
<div class="chart-tooltip" id="tooltip"></div>

<!-- Drill-down modal -->
<div class="modal-backdrop" id="modal-backdrop">
  <div class="modal">
    <span class="close" id="modal-close">&#10005;</span>
    <h2 id="modal-title"></h2>
    <div id="modal-docs"></div>
  </div>
</div>

<!-- Toast -->
<div class="toast" id="toast"></div>

<script>
// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------
let demos = [];
let selectedDemo = null;
let view = null;          // latest chart view from the server
let classifying = false;
let interpreting = false;

// ---------------------------------------------------------------------------
// API helpers
// ---------------------------------------------------------------------------
async function api(method, path, body) {
  const opts = { method, headers: {} };
  if (body) {
    opts.headers['Content-Type'] = 'application/json';
    opts.body = JSON.stringify(body);
  }
  const res = await fetch(path, opts);
  const data = await res.json();
  if (!res.ok) throw new Error(data.error || ('HTTP ' + res.status));
  return data;
}

function toast(msg, isError) {
  const el = document.getElementById('toast');
  el.textContent = msg;
  el.className = 'toast show' + (isError ? ' error' : '');
  setTimeout(() => el.className = 'toast', 3000);
}

function esc(s) {
  if (!s) return '';
  return s.replace(/&/g,'&amp;').replace(/</g,'&lt;').replace(/>/g,'&gt;').replace(/"/g,'&quot;');
}

function show(id) { document.getElementById(id).classList.remove('hidden'); }

// ---------------------------------------------------------------------------
// Demos
// ---------------------------------------------------------------------------
async function loadDemos() {
  try {
    demos = await api('GET', '/api/demos');
    const grid = document.getElementById('demo-grid');
    if (demos.length === 0) {
      grid.innerHTML = '<p style="color:var(--text-muted)">No demos configured. ' +
        'Add [[demos]] entries to ~/.trendlens/config.toml.</p>';
      return;
    }
    grid.innerHTML = demos.map((d, i) => `
      <div class="demo-card" data-demo="${i}">
        <div class="icon">${esc(d.icon)}</div>
        <div class="name">${esc(d.name)}</div>
        <div class="topics">${esc(d.topics.join(', '))}</div>
      </div>
    `).join('');
  } catch (e) {
    toast('Failed to load demos: ' + e.message, true);
  }
}

document.getElementById('demo-grid').addEventListener('click', async e => {
  const card = e.target.closest('.demo-card');
  if (!card) return;
  const demo = demos[parseInt(card.dataset.demo, 10)];
  if (!demo) return;

  document.querySelectorAll('.demo-card').forEach(c => c.classList.remove('selected'));
  card.classList.add('selected');

  try {
    const info = await api('POST', '/api/corpus', { demo: demo.name });
    selectedDemo = demo.name;
    view = null;

    document.getElementById('dataset-title').textContent = info.name + ' Dataset';
    document.getElementById('stat-docs').textContent = info.documents.toLocaleString();
    document.getElementById('stat-from').textContent = info.min_year;
    document.getElementById('stat-to').textContent = info.max_year;
    document.getElementById('topics-input').value = info.topics.join('\n');
    show('dataset-card');
    show('explore-card');
    document.getElementById('chart-card').classList.add('hidden');
    document.getElementById('interp-card').classList.add('hidden');
  } catch (e) {
    toast('Failed to load dataset: ' + e.message, true);
  }
});

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------
const slider = document.getElementById('cutoff-slider');

slider.addEventListener('input', () => {
  document.getElementById('cutoff-value').textContent = slider.value + '%';
});

// Re-derive from the stored matrix; no classifier round-trip.
slider.addEventListener('change', async () => {
  if (!view) return;
  try {
    view = await api('GET', '/api/series?cutoff=' + (slider.value / 100));
    renderView();
  } catch (e) {
    toast('Failed to update cutoff: ' + e.message, true);
  }
});

document.getElementById('btn-classify').addEventListener('click', async () => {
  if (classifying) return;
  const topics = document.getElementById('topics-input').value
    .split('\n').map(t => t.trim()).filter(t => t);
  if (topics.length === 0) {
    toast('Enter at least one topic', true);
    return;
  }

  classifying = true;
  const btn = document.getElementById('btn-classify');
  btn.disabled = true;
  document.getElementById('classify-status').innerHTML =
    '<span class="spinner"></span> Classifying documents...';

  try {
    view = await api('POST', '/api/classify', {
      topics,
      cutoff: slider.value / 100,
    });
    renderView();
    document.getElementById('interp-prompt').value = view.default_prompt;
    show('interp-card');
    toast('Classification complete');
  } catch (e) {
    toast('Classification failed: ' + e.message, true);
  } finally {
    classifying = false;
    btn.disabled = false;
    document.getElementById('classify-status').textContent = '';
  }
});

function renderView() {
  document.getElementById('chart').innerHTML = view.svg;
  show('chart-card');
}

// ---------------------------------------------------------------------------
// Chart events (delegated onto the injected SVG)
// ---------------------------------------------------------------------------
const chartEl = document.getElementById('chart');
const tooltip = document.getElementById('tooltip');

chartEl.addEventListener('mouseover', e => {
  const marker = e.target.closest('.marker');
  if (!marker || !view) return;
  const topic = view.topics[parseInt(marker.dataset.topic, 10)];
  if (!topic) return;
  const point = topic.points[parseInt(marker.dataset.year, 10)];
  if (!point) return;

  marker.setAttribute('r', '8');

  let html = `<div class="tt-title">${esc(topic.topic)} &#8212; ${esc(point.year)}</div>` +
    `${point.count} document${point.count === 1 ? '' : 's'}`;
  if (point.example) {
    html += `<div class="tt-doc">${esc(point.example.title)}</div>` +
      `<div>${esc(point.example.excerpt)}</div>`;
  }
  tooltip.innerHTML = html;
  tooltip.classList.add('show');
});

chartEl.addEventListener('mousemove', e => {
  tooltip.style.left = (e.pageX + 12) + 'px';
  tooltip.style.top = (e.pageY - 10) + 'px';
});

chartEl.addEventListener('mouseout', e => {
  const marker = e.target.closest('.marker');
  if (marker) marker.setAttribute('r', '5');
  tooltip.classList.remove('show');
});

chartEl.addEventListener('click', async e => {
  if (!view) return;

  // Legend click toggles the topic's line
  const legendItem = e.target.closest('.legend-item');
  if (legendItem) {
    const topic = view.topics[parseInt(legendItem.dataset.topic, 10)];
    if (!topic) return;
    try {
      const state = await api('POST', '/api/chart/toggle', { topic: topic.topic });
      topic.visible = state.visible;
      const group = chartEl.querySelector(`.line-group[data-topic="${legendItem.dataset.topic}"]`);
      if (group) group.style.opacity = state.opacity;
      legendItem.style.opacity = state.visible ? 1 : 0.5;
    } catch (err) {
      toast('Failed to toggle topic: ' + err.message, true);
    }
    return;
  }

  // Marker click drills down to the documents behind the point
  const marker = e.target.closest('.marker');
  if (!marker) return;
  const topic = view.topics[parseInt(marker.dataset.topic, 10)];
  if (!topic) return;
  const point = topic.points[parseInt(marker.dataset.year, 10)];
  if (!point) return;

  try {
    const data = await api('GET', '/api/docs?topic=' +
      encodeURIComponent(topic.topic) + '&year=' + encodeURIComponent(point.year));
    openModal(topic.topic, point.year, data.documents);
  } catch (err) {
    toast('Failed to load documents: ' + err.message, true);
  }
});

// ---------------------------------------------------------------------------
// Drill-down modal
// ---------------------------------------------------------------------------
function openModal(topic, year, docs) {
  document.getElementById('modal-title').textContent =
    topic + ' in ' + year + ' (' + docs.length + ')';
  document.getElementById('modal-docs').innerHTML = docs.length === 0
    ? '<p style="color:var(--text-muted)">No documents for this point.</p>'
    : docs.map(d => `
      <div class="doc-item">
        <a href="${esc(d.link)}" target="_blank" rel="noopener">${esc(d.title)}</a>
        <div class="excerpt">${esc(d.excerpt)}</div>
      </div>
    `).join('');
  document.getElementById('modal-backdrop').classList.add('show');
}

document.getElementById('modal-close').addEventListener('click', () => {
  document.getElementById('modal-backdrop').classList.remove('show');
});

document.getElementById('modal-backdrop').addEventListener('click', e => {
  if (e.target.id === 'modal-backdrop') e.target.classList.remove('show');
});

// ---------------------------------------------------------------------------
// Interpretation (streamed)
// ---------------------------------------------------------------------------
document.getElementById('btn-interpret').addEventListener('click', async () => {
  if (interpreting || !view) return;
  const prompt = document.getElementById('interp-prompt').value.trim();
  if (!prompt) {
    toast('Enter a prompt', true);
    return;
  }

  interpreting = true;
  const btn = document.getElementById('btn-interpret');
  btn.disabled = true;
  document.getElementById('interp-status').innerHTML =
    '<span class="spinner"></span> Analyzing...';

  const out = document.getElementById('interp-output');
  out.classList.add('show');
  out.innerHTML = '';
  let text = '';

  try {
    const res = await fetch('/api/interpret', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify({ prompt }),
    });
    if (!res.ok) {
      const data = await res.json();
      throw new Error(data.error || ('HTTP ' + res.status));
    }

    const reader = res.body.getReader();
    const decoder = new TextDecoder();
    let buffer = '';

    for (;;) {
      const { done, value } = await reader.read();
      if (done) break;
      buffer += decoder.decode(value, { stream: true });

      const events = buffer.split('\n\n');
      buffer = events.pop();
      for (const event of events) {
        if (!event.startsWith('data: ')) continue;
        const payload = JSON.parse(event.slice(6));
        if (payload.error) throw new Error(payload.error);
        if (payload.delta) {
          text += payload.delta;
          out.innerHTML = md(text);
        }
      }
    }
  } catch (e) {
    toast('Interpretation failed: ' + e.message, true);
  } finally {
    interpreting = false;
    btn.disabled = false;
    document.getElementById('interp-status').textContent = '';
  }
});

// Minimal markdown rendering for the streamed interpretation.
function md(src) {
  const lines = esc(src).split('\n');
  let html = '', inList = false;
  for (const line of lines) {
    const h = line.match(/^(#{1,3}) +(.*)$/);
    const li = line.match(/^[-*] +(.*)$/);
    if (inList && !li) { html += '</ul>'; inList = false; }
    if (h) {
      html += `<h${h[1].length + 1}>${inline(h[2])}</h${h[1].length + 1}>`;
    } else if (li) {
      if (!inList) { html += '<ul>'; inList = true; }
      html += `<li>${inline(li[1])}</li>`;
    } else if (line.trim()) {
      html += `<p>${inline(line)}</p>`;
    }
  }
  if (inList) html += '</ul>';
  return html;
}

function inline(s) {
  return s
    .replace(/\*\*([^*]+)\*\*/g, '<strong>$1</strong>')
    .replace(/\*([^*]+)\*/g, '<em>$1</em>')
    .replace(/`([^`]+)`/g, '<code>$1</code>');
}

// ---------------------------------------------------------------------------
// Health badges
// ---------------------------------------------------------------------------
async function loadHealth() {
  try {
    const h = await api('GET', '/api/health');
    const badges = document.getElementById('health-badges');
    badges.innerHTML = [
      badge(h.embedding_model, 'ok'),
      badge('Token', h.token_set ? 'ok' : 'warn'),
    ].join('');
  } catch (e) {
    // Health badges are cosmetic, errors here are not surfaced
  }
}

function badge(label, cls) {
  const dot = cls === 'ok' ? '&#9679;' : '&#9675;';
  return `<span class="badge ${cls}">${dot} ${esc(label)}</span>`;
}

// ---------------------------------------------------------------------------
// Init
// ---------------------------------------------------------------------------
loadHealth();
loadDemos();
</script>
</body>
</html>
"##;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frontend_is_complete_html() {
        assert!(INDEX_HTML.starts_with("<!DOCTYPE html>"));
        assert!(INDEX_HTML.contains("</html>"));
    }

    #[test]
    fn frontend_wires_api_endpoints() {
        for endpoint in [
            "/api/demos",
            "/api/corpus",
            "/api/classify",
            "/api/series",
            "/api/chart/toggle",
            "/api/docs",
            "/api/interpret",
            "/api/health",
        ] {
            assert!(INDEX_HTML.contains(endpoint), "missing {endpoint}");
        }
    }
}
